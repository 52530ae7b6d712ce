use serde::{Deserialize, Serialize};

/// Static reference data, seeded once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i32,
    pub name: String,
}

/// Doctors carry short code ids ("CA001") and belong to exactly one
/// department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub department_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
