// libs/slot-cell/src/services/bulk.rs
//
// Advanced bulk generation: a weekly pattern applied across a calendar date
// range, minus excluded dates and excluded time ranges.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    AdvancedBulkRequest, GenerationSummary, SlotCandidate, SlotError, SmartCreateResponse,
};
use crate::services::generator::{
    self, fetch_teacher_week_slots, insert_candidates, tile_interval,
    MAX_MEETING_DURATION_MINUTES, MIN_MEETING_DURATION_MINUTES,
};
use crate::services::validator;

// ==============================================================================
// PURE PLAN CONSTRUCTION
// ==============================================================================

fn validate_bulk_pattern(request: &AdvancedBulkRequest) -> Result<(), SlotError> {
    let pattern = &request.pattern;

    if pattern.start_time >= pattern.end_time {
        return Err(SlotError::InvalidPattern(
            "Start time must be before end time".to_string(),
        ));
    }

    if pattern.slot_duration_minutes < MIN_MEETING_DURATION_MINUTES
        || pattern.slot_duration_minutes > MAX_MEETING_DURATION_MINUTES
    {
        return Err(SlotError::InvalidPattern(format!(
            "Slot duration must be between {} and {} minutes",
            MIN_MEETING_DURATION_MINUTES, MAX_MEETING_DURATION_MINUTES
        )));
    }

    if pattern.break_duration_minutes.unwrap_or(0) < 0 {
        return Err(SlotError::InvalidPattern(
            "Break duration cannot be negative".to_string(),
        ));
    }

    if pattern.days_of_week.is_empty() {
        return Err(SlotError::InvalidPattern(
            "At least one day of the week is required".to_string(),
        ));
    }

    if pattern.days_of_week.iter().any(|d| !(0..=6).contains(d)) {
        return Err(SlotError::InvalidPattern(
            "Days of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
        ));
    }

    if request.date_range.start_date > request.date_range.end_date {
        return Err(SlotError::InvalidPattern(
            "Date range start must not be after its end".to_string(),
        ));
    }

    Ok(())
}

/// Expand the request into candidates: every date in range whose weekday is
/// in the pattern, excluded dates skipped, the day tiled with the configured
/// break gap, and tiles overlapping an exclusion time range dropped.
pub fn build_bulk_plan(request: &AdvancedBulkRequest) -> Result<Vec<SlotCandidate>, SlotError> {
    validate_bulk_pattern(request)?;

    let pattern = &request.pattern;
    let days: BTreeSet<i32> = pattern.days_of_week.iter().copied().collect();
    let excluded_dates: BTreeSet<NaiveDate> = request
        .exclusions
        .as_ref()
        .and_then(|e| e.dates.clone())
        .unwrap_or_default()
        .into_iter()
        .collect();
    let excluded_ranges = request
        .exclusions
        .as_ref()
        .and_then(|e| e.time_ranges.clone())
        .unwrap_or_default();

    let gap = pattern.break_duration_minutes.unwrap_or(0);
    let tiles = tile_interval(
        pattern.start_time,
        pattern.end_time,
        pattern.slot_duration_minutes,
        gap,
    );

    let mut candidates = Vec::new();
    let mut date = request.date_range.start_date;

    while date <= request.date_range.end_date {
        let day_of_week = validator::day_of_week_for(date);

        if days.contains(&day_of_week) && !excluded_dates.contains(&date) {
            for (tile_start, tile_end) in &tiles {
                let excluded = excluded_ranges.iter().any(|range| {
                    validator::times_overlap(
                        *tile_start,
                        *tile_end,
                        range.start_time,
                        range.end_time,
                    )
                });
                if excluded {
                    continue;
                }

                candidates.push(SlotCandidate {
                    teacher_id: request.teacher_id,
                    day_of_week,
                    start_time: *tile_start,
                    end_time: *tile_end,
                    week_start_date: validator::week_start_for(date),
                });
            }
        }

        date += Duration::days(1);
    }

    Ok(candidates)
}

// ==============================================================================
// BULK SERVICE
// ==============================================================================

pub struct AdvancedBulkService {
    db: PostgrestClient,
}

impl AdvancedBulkService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Validate the plan against persisted slots week by week, then persist
    /// the survivors in one bulk insert. Conflicts accumulate in the summary
    /// rather than aborting the batch.
    pub async fn generate(
        &self,
        request: AdvancedBulkRequest,
    ) -> Result<SmartCreateResponse, SlotError> {
        info!(
            "Advanced bulk generation for teacher {} from {} to {}",
            request.teacher_id, request.date_range.start_date, request.date_range.end_date
        );

        let candidates = build_bulk_plan(&request)?;

        let weeks: BTreeSet<NaiveDate> =
            candidates.iter().map(|c| c.week_start_date).collect();

        let mut accepted = Vec::new();
        let mut conflicts = Vec::new();

        // Only the weeks the plan touches are fetched; unrelated slots stay
        // out of the conflict-check window.
        for week_start in weeks {
            let existing =
                fetch_teacher_week_slots(&self.db, request.teacher_id, week_start).await?;

            let week_candidates: Vec<SlotCandidate> = candidates
                .iter()
                .filter(|c| c.week_start_date == week_start)
                .cloned()
                .collect();

            let (week_accepted, week_conflicts) =
                generator::partition_conflicts(week_candidates, &existing);

            debug!(
                "Week {}: {} accepted, {} conflicts",
                week_start,
                week_accepted.len(),
                week_conflicts.len()
            );

            accepted.extend(week_accepted);
            conflicts.extend(
                week_conflicts
                    .into_iter()
                    .map(|reason| format!("week {}: {}", week_start, reason)),
            );
        }

        let created_slots = if accepted.is_empty() {
            Vec::new()
        } else {
            insert_candidates(&self.db, &accepted).await?
        };

        info!(
            "Advanced bulk generation created {} slots, skipped {}",
            created_slots.len(),
            conflicts.len()
        );

        Ok(SmartCreateResponse {
            summary: GenerationSummary {
                total_created: created_slots.len(),
                total_skipped: conflicts.len(),
                conflicts,
            },
            created_slots,
        })
    }
}
