use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One patient row per account (1:1 on `user_id`). Created lazily the first
/// time a profile is read or written; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Name a freshly created profile gets until the patient fills it in.
pub const PLACEHOLDER_NAME: &str = "Unnamed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<Patient> for Profile {
    fn from(patient: Patient) -> Self {
        Self {
            name: patient.name,
            email: patient.email,
            phone: patient.phone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient profile not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
