// libs/appointment-cell/src/services/consistency.rs
//
// Slot-claim consistency service. Two concurrent book() calls on the same
// slot must resolve to exactly one winner: a short-lived scheduling lock
// bounds the critical section, and the conditional update on
// `is_booked=eq.false` is the row-level check-and-set the loser fails on.

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use slot_cell::models::Slot;

use crate::models::{AppointmentError, SchedulingLock};

pub struct SlotClaimService {
    db: PostgrestClient,
    lock_timeout_seconds: i64,
    max_lock_attempts: u32,
}

impl SlotClaimService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
            lock_timeout_seconds: 30,
            max_lock_attempts: 3,
        }
    }

    /// Atomically flip the slot from free to booked. Returns the claimed
    /// slot row, or `SlotUnavailable` when a concurrent booking already
    /// holds it.
    pub async fn claim_slot(&self, slot_id: Uuid) -> Result<Slot, AppointmentError> {
        let lock_key = lock_key_for(slot_id);

        let lock_acquired = self.acquire_scheduling_lock(&lock_key, slot_id).await?;
        if !lock_acquired {
            // Someone else is mid-booking on this slot.
            return Err(AppointmentError::SlotUnavailable);
        }

        let claim_result = self.try_claim(slot_id).await;

        // The lock only bounds the window; release it regardless of outcome.
        if let Err(e) = self.release_scheduling_lock(&lock_key).await {
            warn!("Failed to release scheduling lock {}: {}", lock_key, e);
        }

        claim_result
    }

    /// Flip the slot back to free after a cancellation or a failed booking.
    pub async fn release_slot(&self, slot_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/available_slots?id=eq.{}", slot_id);
        let body = json!({
            "is_booked": false,
            "updated_at": Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self
            .db
            .request(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        debug!("Slot {} released", slot_id);
        Ok(())
    }

    async fn try_claim(&self, slot_id: Uuid) -> Result<Slot, AppointmentError> {
        // The filter on is_booked makes this a check-and-set: zero affected
        // rows means the slot was taken between our read and this write.
        let path = format!(
            "/rest/v1/available_slots?id=eq.{}&is_booked=eq.false",
            slot_id
        );
        let body = json!({
            "is_booked": true,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows = self
            .db
            .request_returning(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            info!("Slot {} claim lost: already booked", slot_id);
            return Err(AppointmentError::SlotUnavailable);
        };

        let slot: Slot = serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse slot: {}", e)))?;

        debug!("Slot {} claimed", slot_id);
        Ok(slot)
    }

    // ==============================================================================
    // SCHEDULING LOCKS
    // ==============================================================================

    async fn acquire_scheduling_lock(
        &self,
        lock_key: &str,
        slot_id: Uuid,
    ) -> Result<bool, AppointmentError> {
        for attempt in 1..=self.max_lock_attempts {
            if self.try_acquire_lock_once(lock_key, slot_id).await? {
                return Ok(true);
            }

            // Lock held. If it expired, clean it up and retry immediately,
            // otherwise back off briefly.
            if self.check_and_cleanup_expired_lock(lock_key).await? {
                continue;
            }

            if attempt < self.max_lock_attempts {
                tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64)).await;
            }
        }

        Ok(false)
    }

    async fn try_acquire_lock_once(
        &self,
        lock_key: &str,
        slot_id: Uuid,
    ) -> Result<bool, AppointmentError> {
        let lock = SchedulingLock {
            lock_key: lock_key.to_string(),
            slot_id,
            acquired_at: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(self.lock_timeout_seconds),
            process_id: format!("booking_{}", Uuid::new_v4()),
        };
        let lock_data = json!(lock);

        // The primary key on lock_key makes the insert the mutual exclusion.
        match self
            .db
            .request::<Value>(Method::POST, "/rest/v1/scheduling_locks", Some(lock_data))
            .await
        {
            Ok(_) => {
                debug!("Scheduling lock acquired: {}", lock_key);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn release_scheduling_lock(&self, lock_key: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/scheduling_locks?lock_key=eq.{}", lock_key);
        let _: Value = self
            .db
            .request(Method::DELETE, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(format!("Lock release failed: {}", e)))?;

        debug!("Scheduling lock released: {}", lock_key);
        Ok(())
    }

    async fn check_and_cleanup_expired_lock(
        &self,
        lock_key: &str,
    ) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/scheduling_locks?lock_key=eq.{}", lock_key);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(format!("Lock check failed: {}", e)))?;

        let Some(lock) = rows.first() else {
            // Lock vanished between our insert attempt and this check.
            return Ok(true);
        };

        let expired = lock
            .get("expires_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|expires_at| expires_at.with_timezone(&Utc) < Utc::now())
            .unwrap_or(false);

        if expired {
            self.release_scheduling_lock(lock_key).await?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Remove stale lock rows; run periodically from the API process.
    pub async fn cleanup_expired_locks(&self) -> Result<usize, AppointmentError> {
        let path = format!(
            "/rest/v1/scheduling_locks?expires_at=lt.{}",
            urlencoded_now()
        );

        let rows = self
            .db
            .request_returning(Method::DELETE, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(format!("Lock cleanup failed: {}", e)))?;

        if !rows.is_empty() {
            info!("Cleaned up {} expired scheduling locks", rows.len());
        }

        Ok(rows.len())
    }
}

fn lock_key_for(slot_id: Uuid) -> String {
    format!("slot_{}", slot_id)
}

fn urlencoded_now() -> String {
    urlencoding::encode(&Utc::now().to_rfc3339()).into_owned()
}
