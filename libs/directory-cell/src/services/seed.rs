use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::DirectoryError;

const DEPARTMENTS: &[(i32, &str)] = &[
    (1, "General Medicine"),
    (2, "Cardiology"),
    (3, "Dermatology"),
    (4, "Orthopedics"),
    (5, "Pediatrics"),
    (6, "Neurology"),
    (7, "Ophthalmology"),
    (8, "Dentistry"),
    (9, "Gynecology"),
    (10, "Psychiatry"),
];

const DOCTORS: &[(&str, &str, i32)] = &[
    ("GM001", "Dr. John Smith", 1),
    ("GM002", "Dr. Sarah Johnson", 1),
    ("GM003", "Dr. Michael Brown", 1),
    ("CA001", "Dr. Emily Davis", 2),
    ("CA002", "Dr. Robert Wilson", 2),
    ("CA003", "Dr. Jennifer Lee", 2),
    ("DE001", "Dr. David Miller", 3),
    ("DE002", "Dr. Lisa Anderson", 3),
    ("DE003", "Dr. James Taylor", 3),
    ("OR001", "Dr. Patricia Martinez", 4),
    ("OR002", "Dr. Thomas Garcia", 4),
    ("OR003", "Dr. Nancy Rodriguez", 4),
    ("PE001", "Dr. Richard Lewis", 5),
    ("PE002", "Dr. Karen Walker", 5),
    ("PE003", "Dr. Steven Hall", 5),
    ("NE001", "Dr. Susan Allen", 6),
    ("NE002", "Dr. Paul Young", 6),
    ("NE003", "Dr. Betty King", 6),
    ("OP001", "Dr. Mark Wright", 7),
    ("OP002", "Dr. Linda Scott", 7),
    ("OP003", "Dr. George Adams", 7),
    ("DN001", "Dr. Helen Baker", 8),
    ("DN002", "Dr. Daniel Nelson", 8),
    ("DN003", "Dr. Olivia Carter", 8),
    ("GY001", "Dr. Charles Mitchell", 9),
    ("GY002", "Dr. Donna Perez", 9),
    ("GY003", "Dr. Edward Roberts", 9),
    ("PS001", "Dr. Sandra Turner", 10),
    ("PS002", "Dr. Joseph Phillips", 10),
    ("PS003", "Dr. Carol Campbell", 10),
];

/// Idempotent startup seed for the directory reference data. Skips entirely
/// when departments already exist, so restarts never duplicate rows.
pub struct DirectorySeedService {
    supabase: SupabaseClient,
}

impl DirectorySeedService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn seed_if_empty(&self) -> Result<bool, DirectoryError> {
        let existing: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/departments?select=id&limit=1",
                None,
                None,
            )
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            debug!("Directory data already seeded, skipping");
            return Ok(false);
        }

        info!("Seeding directory reference data");

        let departments: Vec<Value> = DEPARTMENTS
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/departments",
                None,
                Some(Value::Array(departments)),
                Some(headers.clone()),
            )
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Value> = DOCTORS
            .iter()
            .map(|(id, name, department_id)| {
                json!({ "id": id, "name": name, "department_id": department_id })
            })
            .collect();

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                None,
                Some(Value::Array(doctors)),
                Some(headers),
            )
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        info!(
            "Seeded {} departments and {} doctors",
            DEPARTMENTS.len(),
            DOCTORS.len()
        );
        Ok(true)
    }
}
