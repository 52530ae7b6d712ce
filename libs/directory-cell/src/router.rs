use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

// Reference data is world-readable; no auth middleware here.
pub fn directory_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/departments", get(handlers::list_departments))
        .route("/departments/{department_id}/doctors", get(handlers::list_doctors))
        .with_state(state)
}
