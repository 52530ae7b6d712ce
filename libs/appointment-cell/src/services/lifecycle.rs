use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Pure transition table for the appointment state machine. Scheduled is the
/// only non-terminal state.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        let valid_transitions = self.get_valid_transitions(current_status);

        if !valid_transitions.contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);

            // Re-cancelling is its own user-facing error rather than a
            // generic transition failure.
            if current_status == AppointmentStatus::Cancelled
                && new_status == AppointmentStatus::Cancelled
            {
                return Err(AppointmentError::AlreadyCancelled);
            }

            return Err(AppointmentError::InvalidStatusTransition(current_status));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// New bookings must land in the future.
    pub fn validate_appointment_timing(
        &self,
        scheduled_time: DateTime<Utc>,
        current_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if scheduled_time <= current_time {
            return Err(AppointmentError::InvalidTime(
                "Appointment must be scheduled for a future time".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    #[test]
    fn scheduled_can_complete_or_cancel() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Completed)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled
            ),
            Err(AppointmentError::InvalidStatusTransition(_))
        );
        assert_matches!(
            lifecycle.validate_status_transition(
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed
            ),
            Err(AppointmentError::InvalidStatusTransition(_))
        );
    }

    #[test]
    fn re_cancelling_is_reported_as_already_cancelled() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(
                AppointmentStatus::Cancelled,
                AppointmentStatus::Cancelled
            ),
            Err(AppointmentError::AlreadyCancelled)
        );
    }

    #[test]
    fn booking_must_be_in_the_future() {
        let lifecycle = AppointmentLifecycleService::new();
        let now = Utc::now();

        assert!(lifecycle
            .validate_appointment_timing(now + Duration::hours(1), now)
            .is_ok());
        assert_matches!(
            lifecycle.validate_appointment_timing(now - Duration::hours(1), now),
            Err(AppointmentError::InvalidTime(_))
        );
        assert_matches!(
            lifecycle.validate_appointment_timing(now, now),
            Err(AppointmentError::InvalidTime(_))
        );
    }
}
