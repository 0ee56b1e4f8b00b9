// libs/slot-cell/src/services/validator.rs
//
// Pure checks behind slot creation and update. Nothing here touches
// storage; callers fetch the comparison set and persist on success.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use crate::models::{Slot, SlotCandidate, SlotError};

/// Invariant: `start_time < end_time` for every slot.
pub fn validate_time_range(start_time: NaiveTime, end_time: NaiveTime) -> Result<(), SlotError> {
    if start_time >= end_time {
        return Err(SlotError::InvalidTimeRange);
    }
    Ok(())
}

/// `week_start_date` anchors the week and must be a Monday.
pub fn validate_week_start(week_start_date: NaiveDate) -> Result<(), SlotError> {
    if week_start_date.weekday() != Weekday::Mon {
        return Err(SlotError::InvalidWeekStart);
    }
    Ok(())
}

/// Half-open interval overlap: `[a_start, a_end)` intersects `[b_start, b_end)`.
pub fn times_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Check a candidate against a teacher's persisted slots. Only slots sharing
/// the candidate's week and day compete; `exclude_slot_id` skips the slot
/// being updated.
pub fn validate_against_existing(
    candidate: &SlotCandidate,
    existing: &[Slot],
    exclude_slot_id: Option<Uuid>,
) -> Result<(), SlotError> {
    validate_time_range(candidate.start_time, candidate.end_time)?;

    for slot in existing {
        if Some(slot.id) == exclude_slot_id {
            continue;
        }
        if slot.day_of_week != candidate.day_of_week
            || slot.week_start_date != candidate.week_start_date
        {
            continue;
        }
        if times_overlap(
            candidate.start_time,
            candidate.end_time,
            slot.start_time,
            slot.end_time,
        ) {
            return Err(SlotError::SlotConflict {
                conflicting_slot_id: slot.id,
            });
        }
    }

    Ok(())
}

/// Day index for a calendar date, 0=Monday..6=Sunday.
pub fn day_of_week_for(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_monday() as i32
}

/// The Monday of the week containing `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
