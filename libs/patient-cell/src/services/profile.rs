use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, PatientError, UpdateProfileRequest, PLACEHOLDER_NAME};

/// Patient profile store, keyed 1:1 by account id.
pub struct PatientProfileService {
    supabase: SupabaseClient,
}

impl PatientProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Lookup without side effects. Booking uses this: an absent profile is
    /// a precondition failure there, not a trigger for creation.
    pub async fn find_profile(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Option<Patient>, PatientError> {
        debug!("Looking up patient profile for account {}", account_id);

        let path = format!("/rest/v1/patients?user_id=eq.{}", account_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let patient: Patient = serde_json::from_value(row)
                    .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))?;
                Ok(Some(patient))
            }
            None => Ok(None),
        }
    }

    /// Read-or-create: reading a profile that does not exist yet inserts a
    /// placeholder row and returns it. The write-on-read is part of the
    /// contract, mirrored by the profile page showing "Unnamed" on first
    /// visit. Callers that must not create go through `find_profile`.
    pub async fn get_profile(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        if let Some(patient) = self.find_profile(account_id, auth_token).await? {
            return Ok(patient);
        }

        info!("No profile for account {}, creating placeholder", account_id);
        self.create_placeholder(account_id, auth_token).await
    }

    /// Overwrites all three contact fields, creating the row when absent.
    pub async fn update_profile(
        &self,
        account_id: &str,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile for account {}", account_id);

        let existing = self.find_profile(account_id, auth_token).await?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = if existing.is_some() {
            let update_data = json!({
                "name": request.name,
                "email": request.email,
                "phone": request.phone,
                "updated_at": Utc::now().to_rfc3339()
            });

            let path = format!("/rest/v1/patients?user_id=eq.{}", account_id);
            self.supabase
                .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update_data), Some(headers))
                .await
                .map_err(|e| PatientError::DatabaseError(e.to_string()))?
        } else {
            let now = Utc::now().to_rfc3339();
            let insert_data = json!({
                "user_id": account_id,
                "name": request.name,
                "email": request.email,
                "phone": request.phone,
                "created_at": now,
                "updated_at": now
            });

            self.supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/patients",
                    Some(auth_token),
                    Some(insert_data),
                    Some(headers),
                )
                .await
                .map_err(|e| PatientError::DatabaseError(e.to_string()))?
        };

        let patient = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to persist profile".to_string()))?;

        serde_json::from_value(patient)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    async fn create_placeholder(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let now = Utc::now().to_rfc3339();
        let insert_data = json!({
            "user_id": account_id,
            "name": PLACEHOLDER_NAME,
            "email": "",
            "phone": "",
            "created_at": now,
            "updated_at": now
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(insert_data),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let patient = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create placeholder profile".to_string()))?;

        serde_json::from_value(patient)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }
}
