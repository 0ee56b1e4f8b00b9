// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub teacher_id: Uuid,
    /// Exclusive reference: at most one non-cancelled appointment per slot.
    pub slot_id: Uuid,
    pub meeting_mode: MeetingMode,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MeetingMode {
    Online,
    FaceToFace,
}

impl fmt::Display for MeetingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingMode::Online => write!(f, "online"),
            MeetingMode::FaceToFace => write!(f, "face_to_face"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Whether an appointment in this status keeps its slot booked. Everything
    /// except cancellation does: `is_booked` tracks the existence of a
    /// non-cancelled appointment.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub parent_id: Uuid,
    pub teacher_id: Uuid,
    pub slot_id: Uuid,
    pub meeting_mode: MeetingMode,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentStatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentSearchQuery {
    pub parent_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub slot_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
    pub total: usize,
    pub skip: i32,
    pub limit: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub confirmed_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub no_show_appointments: usize,
}

impl AppointmentSummary {
    pub fn from_appointments(appointments: &[Appointment]) -> Self {
        let count =
            |status: AppointmentStatus| appointments.iter().filter(|a| a.status == status).count();
        Self {
            total_appointments: appointments.len(),
            pending_appointments: count(AppointmentStatus::Pending),
            confirmed_appointments: count(AppointmentStatus::Confirmed),
            completed_appointments: count(AppointmentStatus::Completed),
            cancelled_appointments: count(AppointmentStatus::Cancelled),
            no_show_appointments: count(AppointmentStatus::NoShow),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentAppointmentsResponse {
    pub parent_id: Uuid,
    pub appointments: Vec<Appointment>,
    pub summary: AppointmentSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherAppointmentsResponse {
    pub teacher_id: Uuid,
    pub appointments: Vec<Appointment>,
    pub summary: AppointmentSummary,
}

// ==============================================================================
// SCHEDULING LOCK MODELS
// ==============================================================================

/// Short-lived lock row bounding the book() critical section. The row-level
/// check-and-set on the slot flag remains the authoritative guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingLock {
    pub lock_key: String,
    pub slot_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub process_id: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Parent not found")]
    ParentNotFound,

    #[error("Slot is not available for booking")]
    SlotUnavailable,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}
