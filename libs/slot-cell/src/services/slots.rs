// libs/slot-cell/src/services/slots.rs
use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    BulkSlotCreateRequest, CreateSlotRequest, Slot, SlotCandidate, SlotError, SlotListResponse,
    UpdateSlotRequest, WeeklyScheduleResponse,
};
use crate::services::generator::{fetch_teacher_week_slots, insert_candidates};
use crate::services::validator;

#[derive(Debug, Clone, Default)]
pub struct SlotListFilter {
    pub teacher_id: Option<Uuid>,
    pub week_start: Option<NaiveDate>,
    pub available_only: bool,
    pub skip: i32,
    pub limit: i32,
}

pub struct SlotService {
    db: PostgrestClient,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn list_slots(&self, filter: SlotListFilter) -> Result<SlotListResponse, SlotError> {
        let mut query_parts = Vec::new();

        if let Some(teacher_id) = filter.teacher_id {
            query_parts.push(format!("teacher_id=eq.{}", teacher_id));
        }
        if let Some(week_start) = filter.week_start {
            query_parts.push(format!("week_start_date=eq.{}", week_start));
        }
        if filter.available_only {
            query_parts.push("is_booked=eq.false".to_string());
        }

        let limit = if filter.limit > 0 { filter.limit } else { 100 };
        query_parts.push("order=week_start_date.asc,day_of_week.asc,start_time.asc".to_string());
        query_parts.push(format!("limit={}", limit));
        if filter.skip > 0 {
            query_parts.push(format!("offset={}", filter.skip));
        }

        let path = format!("/rest/v1/available_slots?{}", query_parts.join("&"));
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let slots: Vec<Slot> = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Slot>, _>>()
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slots: {}", e)))?;

        Ok(SlotListResponse {
            total: slots.len(),
            skip: filter.skip,
            limit,
            slots,
        })
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> Result<Slot, SlotError> {
        debug!("Fetching slot: {}", slot_id);

        let path = format!("/rest/v1/available_slots?id=eq.{}", slot_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(SlotError::NotFound);
        }

        serde_json::from_value(rows[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot: {}", e)))
    }

    /// Create a single slot after running it through the validator against
    /// the teacher's slots for the same week.
    pub async fn create_slot(&self, request: CreateSlotRequest) -> Result<Slot, SlotError> {
        validator::validate_time_range(request.start_time, request.end_time)?;
        validator::validate_week_start(request.week_start_date)?;
        if !(0..=6).contains(&request.day_of_week) {
            return Err(SlotError::InvalidPattern(
                "Day of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
            ));
        }

        self.verify_teacher_exists(request.teacher_id).await?;

        let candidate = SlotCandidate {
            teacher_id: request.teacher_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            week_start_date: request.week_start_date,
        };

        let existing =
            fetch_teacher_week_slots(&self.db, request.teacher_id, request.week_start_date).await?;
        validator::validate_against_existing(&candidate, &existing, None)?;

        let created = insert_candidates(&self.db, std::slice::from_ref(&candidate)).await?;
        let slot = created
            .into_iter()
            .next()
            .ok_or_else(|| SlotError::DatabaseError("Failed to create slot".to_string()))?;

        info!("Slot {} created for teacher {}", slot.id, slot.teacher_id);
        Ok(slot)
    }

    /// Explicit bulk creation for one week. The whole batch is validated
    /// first (against storage and against itself) and inserted in a single
    /// statement, so a conflict or storage fault persists nothing.
    pub async fn bulk_create(
        &self,
        request: BulkSlotCreateRequest,
    ) -> Result<Vec<Slot>, SlotError> {
        validator::validate_week_start(request.week_start_date)?;
        self.verify_teacher_exists(request.teacher_id).await?;

        let existing =
            fetch_teacher_week_slots(&self.db, request.teacher_id, request.week_start_date).await?;

        let mut candidates: Vec<SlotCandidate> = Vec::with_capacity(request.time_slots.len());
        for time_slot in &request.time_slots {
            if !(0..=6).contains(&time_slot.day_of_week) {
                return Err(SlotError::InvalidPattern(
                    "Day of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
                ));
            }

            let candidate = SlotCandidate {
                teacher_id: request.teacher_id,
                day_of_week: time_slot.day_of_week,
                start_time: time_slot.start_time,
                end_time: time_slot.end_time,
                week_start_date: request.week_start_date,
            };

            validator::validate_against_existing(&candidate, &existing, None)?;

            // Tuples within the request compete with each other too.
            for earlier in &candidates {
                if earlier.day_of_week == candidate.day_of_week
                    && validator::times_overlap(
                        candidate.start_time,
                        candidate.end_time,
                        earlier.start_time,
                        earlier.end_time,
                    )
                {
                    return Err(SlotError::InvalidPattern(format!(
                        "Requested slots overlap each other on day {}",
                        candidate.day_of_week
                    )));
                }
            }

            candidates.push(candidate);
        }

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let created = insert_candidates(&self.db, &candidates).await?;
        info!(
            "Bulk created {} slots for teacher {}",
            created.len(),
            request.teacher_id
        );
        Ok(created)
    }

    /// Update an unbooked slot. Time-field changes are re-validated against
    /// the rest of the teacher's week, excluding the slot itself.
    pub async fn update_slot(
        &self,
        slot_id: Uuid,
        request: UpdateSlotRequest,
    ) -> Result<Slot, SlotError> {
        let current = self.get_slot(slot_id).await?;

        if current.is_booked {
            return Err(SlotError::SlotInUse);
        }

        let candidate = SlotCandidate {
            teacher_id: current.teacher_id,
            day_of_week: request.day_of_week.unwrap_or(current.day_of_week),
            start_time: request.start_time.unwrap_or(current.start_time),
            end_time: request.end_time.unwrap_or(current.end_time),
            week_start_date: request.week_start_date.unwrap_or(current.week_start_date),
        };

        if !(0..=6).contains(&candidate.day_of_week) {
            return Err(SlotError::InvalidPattern(
                "Day of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
            ));
        }
        validator::validate_week_start(candidate.week_start_date)?;

        let existing =
            fetch_teacher_week_slots(&self.db, current.teacher_id, candidate.week_start_date)
                .await?;
        validator::validate_against_existing(&candidate, &existing, Some(slot_id))?;

        let update_data = json!({
            "day_of_week": candidate.day_of_week,
            "start_time": candidate.start_time.format("%H:%M:%S").to_string(),
            "end_time": candidate.end_time.format("%H:%M:%S").to_string(),
            "week_start_date": candidate.week_start_date.format("%Y-%m-%d").to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/available_slots?id=eq.{}", slot_id);
        let result = self
            .db
            .request_returning(Method::PATCH, &path, Some(update_data))
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SlotError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse updated slot: {}", e)))
    }

    /// Deletion is only legal while the slot is unbooked.
    pub async fn delete_slot(&self, slot_id: Uuid) -> Result<(), SlotError> {
        let current = self.get_slot(slot_id).await?;

        if current.is_booked {
            return Err(SlotError::SlotInUse);
        }

        let path = format!("/rest/v1/available_slots?id=eq.{}", slot_id);
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, &path, None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        info!("Slot {} deleted", slot_id);
        Ok(())
    }

    /// Calendar view: a teacher's week grouped by day with booked counts.
    pub async fn weekly_schedule(
        &self,
        teacher_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<WeeklyScheduleResponse, SlotError> {
        self.verify_teacher_exists(teacher_id).await?;

        let slots = fetch_teacher_week_slots(&self.db, teacher_id, week_start).await?;

        let mut slots_by_day: BTreeMap<i32, Vec<Slot>> = BTreeMap::new();
        let mut available_slots = 0;
        let mut booked_slots = 0;

        let total_slots = slots.len();
        for slot in slots {
            if slot.is_booked {
                booked_slots += 1;
            } else {
                available_slots += 1;
            }
            slots_by_day.entry(slot.day_of_week).or_default().push(slot);
        }

        Ok(WeeklyScheduleResponse {
            teacher_id,
            week_start_date: week_start,
            slots_by_day,
            total_slots,
            available_slots,
            booked_slots,
        })
    }

    async fn verify_teacher_exists(&self, teacher_id: Uuid) -> Result<(), SlotError> {
        let path = format!("/rest/v1/teachers?id=eq.{}", teacher_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(SlotError::TeacherNotFound);
        }

        Ok(())
    }
}
