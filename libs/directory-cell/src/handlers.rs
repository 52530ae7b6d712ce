use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::DirectoryError;
use crate::services::DirectoryService;

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_departments(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&config);

    let departments = service.list_departments().await?;

    Ok(Json(json!({ "departments": departments })))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    Path(department_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&config);

    let doctors = service.list_doctors(department_id).await?;

    Ok(Json(json!({ "doctors": doctors })))
}
