use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};

/// Slot-exclusivity check: a slot is taken when any non-cancelled
/// appointment exists for the same doctor at the exact same start time.
/// The booking service runs this under the per-slot lock so the answer
/// stays true until its insert lands.
pub struct SlotConflictService {
    supabase: SupabaseClient,
}

impl SlotConflictService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn slot_taken(
        &self,
        doctor_id: &str,
        scheduled_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        debug!("Checking slot for doctor {} at {}", doctor_id, scheduled_time);

        // doctor_id comes from the request body; encoding keeps it inside
        // the eq. filter value.
        let time_str = scheduled_time.to_rfc3339();
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&scheduled_time=eq.{}&status=neq.cancelled",
            urlencoding::encode(doctor_id),
            urlencoding::encode(&time_str)
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let conflicting: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        if !conflicting.is_empty() {
            warn!(
                "Slot conflict for doctor {} at {} - {} existing booking(s)",
                doctor_id,
                scheduled_time,
                conflicting.len()
            );
        }

        Ok(!conflicting.is_empty())
    }
}
