// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use notification_cell::NotificationDispatcher;

use crate::models::{
    Appointment, AppointmentError, AppointmentListResponse, AppointmentSearchQuery,
    AppointmentStatus, AppointmentSummary, BookAppointmentRequest, ParentAppointmentsResponse,
    TeacherAppointmentsResponse,
};
use crate::services::consistency::SlotClaimService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    db: PostgrestClient,
    claims: SlotClaimService,
    lifecycle: AppointmentLifecycleService,
    notifications: NotificationDispatcher,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
            claims: SlotClaimService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
            notifications: NotificationDispatcher::new(config),
        }
    }

    /// Book a slot for a parent. The slot flip and the appointment insert
    /// stand or fall together: a failed insert rolls the claim back before
    /// the error surfaces.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking slot {} for parent {} with teacher {}",
            request.slot_id, request.parent_id, request.teacher_id
        );

        self.verify_parent_exists(request.parent_id).await?;

        // Fast precondition pass before entering the critical section.
        let slot = self.fetch_slot(request.slot_id).await?;
        if slot.teacher_id != request.teacher_id || slot.is_booked {
            return Err(AppointmentError::SlotUnavailable);
        }

        // Check-and-set under the scheduling lock; the loser of a race
        // observes SlotUnavailable here even after passing the read above.
        let claimed = self.claims.claim_slot(request.slot_id).await?;

        let appointment = match self.create_appointment_record(&request).await {
            Ok(appointment) => appointment,
            Err(e) => {
                // Creation failed after the flip: free the slot again so the
                // flag keeps tracking appointment existence.
                if let Err(release_err) = self.claims.release_slot(claimed.id).await {
                    warn!(
                        "Failed to release slot {} after booking failure: {}",
                        claimed.id, release_err
                    );
                }
                return Err(e);
            }
        };

        // Best-effort side channel; never rolls the booking back.
        self.notifications
            .appointment_booked(appointment.id, appointment.parent_id, appointment.teacher_id)
            .await;

        info!("Appointment {} booked on slot {}", appointment.id, request.slot_id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(rows[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<AppointmentListResponse, AppointmentError> {
        let mut query_parts = Vec::new();

        if let Some(parent_id) = query.parent_id {
            query_parts.push(format!("parent_id=eq.{}", parent_id));
        }
        if let Some(teacher_id) = query.teacher_id {
            query_parts.push(format!("teacher_id=eq.{}", teacher_id));
        }
        if let Some(status) = &query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(slot_id) = query.slot_id {
            query_parts.push(format!("slot_id=eq.{}", slot_id));
        }

        let limit = query.limit.unwrap_or(100);
        let skip = query.offset.unwrap_or(0);
        query_parts.push("order=created_at.desc".to_string());
        query_parts.push(format!("limit={}", limit));
        if skip > 0 {
            query_parts.push(format!("offset={}", skip));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })?;

        Ok(AppointmentListResponse {
            total: appointments.len(),
            skip,
            limit,
            appointments,
        })
    }

    /// Apply a validated status transition. Cancellation additionally frees
    /// the slot; no other transition touches slot state.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        self.lifecycle
            .validate_status_transition(&current.status, &new_status)?;

        let updated = self
            .write_status(appointment_id, &new_status)
            .await?;

        if self.lifecycle.frees_slot(&new_status) {
            self.claims.release_slot(current.slot_id).await?;
            self.notifications
                .appointment_cancelled(updated.id, updated.parent_id, updated.teacher_id)
                .await;
        } else {
            self.notifications
                .appointment_status_changed(
                    updated.id,
                    updated.parent_id,
                    updated.teacher_id,
                    &new_status.to_string(),
                )
                .await;
        }

        info!(
            "Appointment {} moved from {} to {}",
            appointment_id, current.status, new_status
        );
        Ok(updated)
    }

    /// Cancel an appointment and make its slot bookable again.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);
        self.update_status(appointment_id, AppointmentStatus::Cancelled)
            .await
    }

    pub async fn parent_appointments(
        &self,
        parent_id: Uuid,
    ) -> Result<ParentAppointmentsResponse, AppointmentError> {
        let response = self
            .search_appointments(AppointmentSearchQuery {
                parent_id: Some(parent_id),
                ..Default::default()
            })
            .await?;

        Ok(ParentAppointmentsResponse {
            parent_id,
            summary: AppointmentSummary::from_appointments(&response.appointments),
            appointments: response.appointments,
        })
    }

    pub async fn teacher_appointments(
        &self,
        teacher_id: Uuid,
    ) -> Result<TeacherAppointmentsResponse, AppointmentError> {
        let response = self
            .search_appointments(AppointmentSearchQuery {
                teacher_id: Some(teacher_id),
                ..Default::default()
            })
            .await?;

        Ok(TeacherAppointmentsResponse {
            teacher_id,
            summary: AppointmentSummary::from_appointments(&response.appointments),
            appointments: response.appointments,
        })
    }

    // ==============================================================================
    // PRIVATE HELPERS
    // ==============================================================================

    async fn fetch_slot(&self, slot_id: Uuid) -> Result<slot_cell::models::Slot, AppointmentError> {
        let path = format!("/rest/v1/available_slots?id=eq.{}", slot_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        // A missing slot is indistinguishable from an unavailable one to the
        // booking caller.
        let Some(row) = rows.into_iter().next() else {
            return Err(AppointmentError::SlotUnavailable);
        };

        serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse slot: {}", e)))
    }

    async fn verify_parent_exists(&self, parent_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/parents?id=eq.{}", parent_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(AppointmentError::ParentNotFound);
        }

        Ok(())
    }

    async fn create_appointment_record(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "parent_id": request.parent_id,
            "teacher_id": request.teacher_id,
            "slot_id": request.slot_id,
            "meeting_mode": request.meeting_mode.to_string(),
            "status": AppointmentStatus::Pending.to_string(),
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let rows = self
            .db
            .request_returning(Method::POST, "/rest/v1/appointments", Some(appointment_data))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            return Err(AppointmentError::DatabaseError(
                "Failed to create appointment".to_string(),
            ));
        };

        serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e))
        })
    }

    async fn write_status(
        &self,
        appointment_id: Uuid,
        new_status: &AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let update_data = json!({
            "status": new_status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows = self
            .db
            .request_returning(Method::PATCH, &path, Some(update_data))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            return Err(AppointmentError::NotFound);
        };

        serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e))
        })
    }
}
