// libs/slot-cell/src/services/generator.rs
use chrono::{Duration, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    day_name, GenerationSummary, Slot, SlotCandidate, SlotError, SmartCreateResponse,
    SmartPreviewResponse, SmartSlotConfig,
};
use crate::services::validator;

pub const MIN_MEETING_DURATION_MINUTES: i32 = 15;
pub const MAX_MEETING_DURATION_MINUTES: i32 = 120;

// ==============================================================================
// PURE PATTERN EXPANSION
// ==============================================================================

pub fn validate_pattern(config: &SmartSlotConfig) -> Result<(), SlotError> {
    if config.start_time >= config.end_time {
        return Err(SlotError::InvalidPattern(
            "Start time must be before end time".to_string(),
        ));
    }

    if config.meeting_duration_minutes < MIN_MEETING_DURATION_MINUTES
        || config.meeting_duration_minutes > MAX_MEETING_DURATION_MINUTES
    {
        return Err(SlotError::InvalidPattern(format!(
            "Meeting duration must be between {} and {} minutes",
            MIN_MEETING_DURATION_MINUTES, MAX_MEETING_DURATION_MINUTES
        )));
    }

    if config.days_of_week.is_empty() {
        return Err(SlotError::InvalidPattern(
            "At least one day of the week is required".to_string(),
        ));
    }

    if config.days_of_week.iter().any(|d| !(0..=6).contains(d)) {
        return Err(SlotError::InvalidPattern(
            "Days of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
        ));
    }

    validator::validate_week_start(config.week_start_date)
        .map_err(|_| SlotError::InvalidPattern("Week start date must be a Monday".to_string()))?;

    Ok(())
}

/// Tile `[start, end)` into consecutive sub-intervals of `duration_minutes`,
/// separated by `gap_minutes`. A trailing sub-interval that does not fit
/// entirely before `end` is dropped.
pub fn tile_interval(
    start: NaiveTime,
    end: NaiveTime,
    duration_minutes: i32,
    gap_minutes: i32,
) -> Vec<(NaiveTime, NaiveTime)> {
    let mut tiles = Vec::new();
    let mut current = start;

    loop {
        let (tile_end, wrapped) = current.overflowing_add_signed(Duration::minutes(duration_minutes as i64));
        if wrapped != 0 || tile_end > end {
            break;
        }
        tiles.push((current, tile_end));

        let (next, wrapped_gap) = tile_end.overflowing_add_signed(Duration::minutes(gap_minutes as i64));
        if wrapped_gap != 0 {
            break;
        }
        current = next;
    }

    tiles
}

/// Expand the weekly pattern into candidates, days ascending 0..6.
pub fn build_candidates(config: &SmartSlotConfig) -> Result<Vec<SlotCandidate>, SlotError> {
    validate_pattern(config)?;

    let mut days: Vec<i32> = config.days_of_week.clone();
    days.sort_unstable();
    days.dedup();

    let tiles = tile_interval(
        config.start_time,
        config.end_time,
        config.meeting_duration_minutes,
        0,
    );

    let mut candidates = Vec::with_capacity(days.len() * tiles.len());
    for day in days {
        for (tile_start, tile_end) in &tiles {
            candidates.push(SlotCandidate {
                teacher_id: config.teacher_id,
                day_of_week: day,
                start_time: *tile_start,
                end_time: *tile_end,
                week_start_date: config.week_start_date,
            });
        }
    }

    Ok(candidates)
}

/// Split candidates into those that survive validation against persisted
/// slots and human-readable reasons for the ones that do not. Conflicting
/// candidates are skipped, never fatal.
pub fn partition_conflicts(
    candidates: Vec<SlotCandidate>,
    existing: &[Slot],
) -> (Vec<SlotCandidate>, Vec<String>) {
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut conflicts = Vec::new();

    for candidate in candidates {
        match validator::validate_against_existing(&candidate, existing, None) {
            Ok(()) => accepted.push(candidate),
            Err(SlotError::SlotConflict {
                conflicting_slot_id,
            }) => {
                conflicts.push(format!(
                    "{} {}-{} overlaps existing slot {}",
                    day_name(candidate.day_of_week),
                    candidate.start_time.format("%H:%M"),
                    candidate.end_time.format("%H:%M"),
                    conflicting_slot_id
                ));
            }
            Err(e) => {
                conflicts.push(format!(
                    "{} {}-{} rejected: {}",
                    day_name(candidate.day_of_week),
                    candidate.start_time.format("%H:%M"),
                    candidate.end_time.format("%H:%M"),
                    e
                ));
            }
        }
    }

    (accepted, conflicts)
}

// ==============================================================================
// GENERATOR SERVICE
// ==============================================================================

pub struct SlotGeneratorService {
    db: PostgrestClient,
}

impl SlotGeneratorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Preview mode: expand the pattern and report what create mode would
    /// persist, without touching storage. The candidate set is produced by
    /// the same plan as `create`, so preview and create agree given no
    /// concurrent mutation in between.
    pub async fn preview(
        &self,
        config: SmartSlotConfig,
    ) -> Result<SmartPreviewResponse, SlotError> {
        debug!(
            "Previewing smart slots for teacher {} week {}",
            config.teacher_id, config.week_start_date
        );

        let (accepted, conflicts, slots_per_day) = self.plan(&config).await?;

        if !conflicts.is_empty() {
            debug!(
                "Smart preview skipping {} conflicting candidates",
                conflicts.len()
            );
        }

        let mut days: Vec<i32> = config.days_of_week.clone();
        days.sort_unstable();
        days.dedup();

        let total_hours =
            accepted.len() as f64 * config.meeting_duration_minutes as f64 / 60.0;

        Ok(SmartPreviewResponse {
            total_slots: accepted.len(),
            slots_per_day,
            time_range: format!(
                "{} - {}",
                config.start_time.format("%H:%M"),
                config.end_time.format("%H:%M")
            ),
            days: days.into_iter().map(|d| day_name(d).to_string()).collect(),
            total_hours,
            preview_slots: accepted,
        })
    }

    /// Create mode: persist every non-conflicting candidate in one bulk
    /// insert and report the skipped ones in the summary.
    pub async fn create(&self, config: SmartSlotConfig) -> Result<SmartCreateResponse, SlotError> {
        info!(
            "Generating smart slots for teacher {} week {}",
            config.teacher_id, config.week_start_date
        );

        let (accepted, conflicts, _) = self.plan(&config).await?;

        let created_slots = if accepted.is_empty() {
            warn!(
                "No smart slots to create for teacher {} - all {} candidates conflicted",
                config.teacher_id,
                conflicts.len()
            );
            Vec::new()
        } else {
            insert_candidates(&self.db, &accepted).await?
        };

        info!(
            "Smart generation created {} slots, skipped {} for teacher {}",
            created_slots.len(),
            conflicts.len(),
            config.teacher_id
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

    async fn plan(
        &self,
        config: &SmartSlotConfig,
    ) -> Result<(Vec<SlotCandidate>, Vec<String>, usize), SlotError> {
        let candidates = build_candidates(config)?;
        let slots_per_day = tile_interval(
            config.start_time,
            config.end_time,
            config.meeting_duration_minutes,
            0,
        )
        .len();

        let existing =
            fetch_teacher_week_slots(&self.db, config.teacher_id, config.week_start_date).await?;

        let (accepted, conflicts) = partition_conflicts(candidates, &existing);
        Ok((accepted, conflicts, slots_per_day))
    }
}

// ==============================================================================
// SHARED PERSISTENCE HELPERS
// ==============================================================================

pub(crate) async fn fetch_teacher_week_slots(
    db: &PostgrestClient,
    teacher_id: uuid::Uuid,
    week_start_date: chrono::NaiveDate,
) -> Result<Vec<Slot>, SlotError> {
    let path = format!(
        "/rest/v1/available_slots?teacher_id=eq.{}&week_start_date=eq.{}&order=day_of_week.asc,start_time.asc",
        teacher_id, week_start_date
    );

    let rows: Vec<Value> = db
        .request(Method::GET, &path, None)
        .await
        .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Slot>, _>>()
        .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slots: {}", e)))
}

/// One bulk insert for the whole batch: a storage fault persists nothing.
pub(crate) async fn insert_candidates(
    db: &PostgrestClient,
    candidates: &[SlotCandidate],
) -> Result<Vec<Slot>, SlotError> {
    let now = chrono::Utc::now();
    let rows: Vec<Value> = candidates
        .iter()
        .map(|c| {
            json!({
                "id": uuid::Uuid::new_v4(),
                "teacher_id": c.teacher_id,
                "day_of_week": c.day_of_week,
                "start_time": c.start_time.format("%H:%M:%S").to_string(),
                "end_time": c.end_time.format("%H:%M:%S").to_string(),
                "week_start_date": c.week_start_date.format("%Y-%m-%d").to_string(),
                "is_booked": false,
                "created_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339()
            })
        })
        .collect();

    let result = db
        .request_returning(Method::POST, "/rest/v1/available_slots", Some(json!(rows)))
        .await
        .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

    result
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Slot>, _>>()
        .map_err(|e| SlotError::DatabaseError(format!("Failed to parse created slots: {}", e)))
}
