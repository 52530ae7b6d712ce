use std::collections::HashMap;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use directory_cell::services::DirectoryService;
use patient_cell::services::PatientProfileService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentView, BookingConfirmation,
    ScheduleAppointmentRequest,
};
use crate::services::conflict::SlotConflictService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::SlotLockRegistry;

/// Booking engine: validates and persists appointment requests, enforces
/// slot exclusivity and drives the status state machine. One instance lives
/// in the router state so every request shares the same lock registry.
pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    profile_service: PatientProfileService,
    directory_service: DirectoryService,
    conflict_service: SlotConflictService,
    lifecycle_service: AppointmentLifecycleService,
    slot_locks: SlotLockRegistry,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            profile_service: PatientProfileService::new(config),
            directory_service: DirectoryService::new(config),
            conflict_service: SlotConflictService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
            slot_locks: SlotLockRegistry::new(),
        }
    }

    /// Book a slot for the account's patient.
    ///
    /// A missing profile is a precondition failure; unlike profile reads it
    /// is never auto-created here. The conflict check and insert run under
    /// the per-slot lock, which closes the race where two requests for the
    /// same slot both see it free.
    pub async fn schedule_appointment(
        &self,
        account_id: &str,
        request: ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingConfirmation, AppointmentError> {
        info!(
            "Booking appointment for account {} with doctor {} at {}",
            account_id, request.doctor_id, request.scheduled_time
        );

        self.lifecycle_service
            .validate_appointment_timing(request.scheduled_time, Utc::now())?;

        let patient = self
            .profile_service
            .find_profile(account_id, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::ProfileNotFound)?;

        let doctor = self
            .directory_service
            .get_doctor(&request.doctor_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::UnknownDoctor)?;

        let slot_lock = self
            .slot_locks
            .lock_for(&request.doctor_id, request.scheduled_time);
        let _slot_guard = slot_lock.lock().await;

        if self
            .conflict_service
            .slot_taken(&request.doctor_id, request.scheduled_time, auth_token)
            .await?
        {
            warn!(
                "Slot unavailable for doctor {} at {}",
                request.doctor_id, request.scheduled_time
            );
            return Err(AppointmentError::SlotUnavailable);
        }

        let appointment = self
            .create_appointment_record(patient.id, &request, auth_token)
            .await?;

        info!(
            "Appointment {} booked with doctor {} at {}",
            appointment.id, doctor.id, appointment.scheduled_time
        );

        Ok(BookingConfirmation {
            appointment_id: appointment.id,
            doctor_id: doctor.id,
            doctor_name: doctor.name,
            service: appointment.service,
            scheduled_time: appointment.scheduled_time,
        })
    }

    /// Cancel an appointment owned by the account. The row is kept; only the
    /// status changes, so it stays visible in listings.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment {}", appointment_id);

        let appointment = self
            .get_owned_appointment(appointment_id, account_id, auth_token)
            .await?;

        self.lifecycle_service
            .validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let cancelled = self
            .set_status(appointment_id, AppointmentStatus::Cancelled, auth_token)
            .await?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    /// Mark an owned appointment as completed.
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Completing appointment {}", appointment_id);

        let appointment = self
            .get_owned_appointment(appointment_id, account_id, auth_token)
            .await?;

        self.lifecycle_service
            .validate_status_transition(appointment.status, AppointmentStatus::Completed)?;

        let completed = self
            .set_status(appointment_id, AppointmentStatus::Completed, auth_token)
            .await?;

        info!("Appointment {} completed", appointment_id);
        Ok(completed)
    }

    /// Every appointment of the account's patient, newest first, annotated
    /// with the doctor's display name. Cancelled history is included unless
    /// filtered out by `status`.
    pub async fn list_appointments(
        &self,
        account_id: &str,
        status: Option<AppointmentStatus>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        debug!("Listing appointments for account {}", account_id);

        let patient = match self
            .profile_service
            .find_profile(account_id, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
        {
            Some(patient) => patient,
            // No profile yet means nothing was ever booked.
            None => return Ok(vec![]),
        };

        let mut path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=scheduled_time.desc",
            patient.id
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        let doctor_names = self.doctor_name_index(&appointments).await?;

        let views = appointments
            .into_iter()
            .map(|apt| {
                let doctor_name = doctor_names
                    .get(&apt.doctor_id)
                    .cloned()
                    .unwrap_or_else(|| apt.doctor_id.clone());
                AppointmentView {
                    id: apt.id,
                    doctor_id: apt.doctor_id,
                    doctor_name,
                    service: apt.service,
                    scheduled_time: apt.scheduled_time,
                    status: apt.status,
                }
            })
            .collect();

        Ok(views)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn create_appointment_record(
        &self,
        patient_id: Uuid,
        request: &ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();

        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "service": request.service,
            "scheduled_time": request.scheduled_time.to_rfc3339(),
            "status": AppointmentStatus::Scheduled.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
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
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;

        serde_json::from_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e)))
    }

    /// Fetch an appointment and verify it belongs to a patient owned by the
    /// account. Anything else is NotFound; ids of other patients' bookings
    /// are not distinguishable from nonexistent ones.
    async fn get_owned_appointment(
        &self,
        appointment_id: Uuid,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let patient = self
            .profile_service
            .find_profile(account_id, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}",
            appointment_id, patient.id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = result.into_iter().next().ok_or(AppointmentError::NotFound)?;

        serde_json::from_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn set_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let update_data = json!({
            "status": new_status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to update appointment".to_string()))?;

        serde_json::from_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e)))
    }

    async fn doctor_name_index(
        &self,
        appointments: &[Appointment],
    ) -> Result<HashMap<String, String>, AppointmentError> {
        let mut doctor_ids: Vec<String> =
            appointments.iter().map(|apt| apt.doctor_id.clone()).collect();
        doctor_ids.sort();
        doctor_ids.dedup();

        let doctors = self
            .directory_service
            .get_doctors_by_ids(&doctor_ids)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(doctors.into_iter().map(|d| (d.id, d.name)).collect())
    }
}
