use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Department, DirectoryError, Doctor};

/// Read path over the department/doctor reference data. Read-only after the
/// startup seed; unknown ids produce empty results, never errors.
pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All departments, ordered by name ascending.
    pub async fn list_departments(&self) -> Result<Vec<Department>, DirectoryError> {
        debug!("Listing departments");

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/departments?order=name.asc", None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let departments: Vec<Department> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse departments: {}", e)))?;

        Ok(departments)
    }

    /// Doctors of one department, ordered by name ascending. An unknown or
    /// empty department yields an empty list.
    pub async fn list_doctors(&self, department_id: i32) -> Result<Vec<Doctor>, DirectoryError> {
        debug!("Listing doctors for department {}", department_id);

        let path = format!(
            "/rest/v1/doctors?department_id=eq.{}&order=name.asc",
            department_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    /// Lookup a single doctor by code. Used by the booking engine to verify
    /// the doctor exists and to fetch the display name for confirmations.
    pub async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>, DirectoryError> {
        debug!("Fetching doctor {}", doctor_id);

        // The code is caller-supplied; encode it so it cannot smuggle extra
        // query parameters into the filter.
        let path = format!("/rest/v1/doctors?id=eq.{}", urlencoding::encode(doctor_id));
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let doctor: Doctor = serde_json::from_value(row)
                    .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;
                Ok(Some(doctor))
            }
            None => Ok(None),
        }
    }

    /// Batch lookup for annotating appointment listings with display names.
    pub async fn get_doctors_by_ids(&self, doctor_ids: &[String]) -> Result<Vec<Doctor>, DirectoryError> {
        if doctor_ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = doctor_ids
            .iter()
            .map(|id| urlencoding::encode(id))
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/doctors?id=in.({})", id_list);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }
}
