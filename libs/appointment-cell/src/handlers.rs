use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppointmentError, ListAppointmentsQuery, ScheduleAppointmentRequest};
use crate::services::AppointmentBookingService;

/// Router state for this cell. The booking service is built once so its
/// slot lock registry is shared by every request.
#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
}

impl AppointmentCellState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let booking = Arc::new(AppointmentBookingService::new(&config));
        Self { config, booking }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::SlotUnavailable => AppError::Conflict(err.to_string()),
            AppointmentError::ProfileNotFound => AppError::Precondition(err.to_string()),
            AppointmentError::UnknownDoctor => AppError::NotFound(err.to_string()),
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::AlreadyCancelled => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidStatusTransition(_) => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTime(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<AppointmentCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let confirmation = state
        .booking
        .schedule_appointment(&user.id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "message": "Appointment booked successfully",
        "appointment": confirmation
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .booking
        .list_appointments(&user.id, query.status, auth.token())
        .await?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .cancel_appointment(appointment_id, &user.id, auth.token())
        .await?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .complete_appointment(appointment_id, &user.id, auth.token())
        .await?;

    Ok(Json(json!({
        "message": "Appointment completed successfully",
        "appointment": appointment
    })))
}
