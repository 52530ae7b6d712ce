use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentCellState};

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    let state = AppointmentCellState::new(config.clone());

    Router::new()
        .route("/", post(handlers::schedule_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
