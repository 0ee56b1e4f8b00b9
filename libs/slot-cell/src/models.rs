// libs/slot-cell/src/models.rs
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE SLOT MODELS
// ==============================================================================

/// A single bookable time interval for a teacher in a given week.
/// `day_of_week` runs 0=Monday..6=Sunday; `week_start_date` is the Monday
/// anchoring the week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub week_start_date: NaiveDate,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A slot that has not been persisted yet. Generators produce these and run
/// them through the validator before anything touches storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub teacher_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub week_start_date: NaiveDate,
}

pub fn day_name(day_of_week: i32) -> &'static str {
    match day_of_week {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        6 => "Sunday",
        _ => "Unknown",
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub teacher_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub week_start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSlotRequest {
    pub day_of_week: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub week_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkTimeSlot {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Explicit list of slots for one teacher and week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSlotCreateRequest {
    pub teacher_id: Uuid,
    pub week_start_date: NaiveDate,
    pub time_slots: Vec<BulkTimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotListResponse {
    pub slots: Vec<Slot>,
    pub total: usize,
    pub skip: i32,
    pub limit: i32,
}

// ==============================================================================
// SMART GENERATION MODELS
// ==============================================================================

/// Recurring weekly availability pattern: the smart generator expands this
/// into discrete slot candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartSlotConfig {
    pub teacher_id: Uuid,
    pub days_of_week: Vec<i32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub meeting_duration_minutes: i32,
    pub week_start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartPreviewResponse {
    pub total_slots: usize,
    pub slots_per_day: usize,
    pub time_range: String,
    pub days: Vec<String>,
    pub total_hours: f64,
    pub preview_slots: Vec<SlotCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub total_created: usize,
    pub total_skipped: usize,
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartCreateResponse {
    pub created_slots: Vec<Slot>,
    pub summary: GenerationSummary,
}

// ==============================================================================
// ADVANCED BULK GENERATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPattern {
    pub days_of_week: Vec<i32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub break_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkExclusions {
    pub dates: Option<Vec<NaiveDate>>,
    pub time_ranges: Option<Vec<TimeRange>>,
}

/// Pattern expansion across a multi-week date range with exclusions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedBulkRequest {
    pub teacher_id: Uuid,
    pub pattern: SlotPattern,
    pub date_range: DateRange,
    pub exclusions: Option<BulkExclusions>,
}

// ==============================================================================
// CALENDAR VIEW MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyScheduleResponse {
    pub teacher_id: Uuid,
    pub week_start_date: NaiveDate,
    pub slots_by_day: BTreeMap<i32, Vec<Slot>>,
    pub total_slots: usize,
    pub available_slots: usize,
    pub booked_slots: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SlotError {
    #[error("Slot not found")]
    NotFound,

    #[error("Teacher not found")]
    TeacherNotFound,

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Week start date must be a Monday")]
    InvalidWeekStart,

    #[error("Invalid availability pattern: {0}")]
    InvalidPattern(String),

    #[error("Time slot conflicts with existing slot {conflicting_slot_id}")]
    SlotConflict { conflicting_slot_id: Uuid },

    #[error("Slot is booked and cannot be modified")]
    SlotInUse,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
