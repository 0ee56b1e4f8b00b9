use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;

/// Test configuration pointing the data API at a wiremock server.
pub struct TestConfig {
    pub database_url: String,
    pub database_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            database_url: "http://localhost:54321".to_string(),
            database_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_database_url(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_service_key: self.database_service_key.clone(),
            redis_url: None,
            email_api_url: String::new(),
            email_api_token: String::new(),
            email_from_address: "noreply@school-bookings.example".to_string(),
            notification_worker_count: 1,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned PostgREST rows matching the table shapes the cells read.
pub struct MockDataRows;

impl MockDataRows {
    pub fn user_row(id: &str, email: &str, full_name: &str, role: &str) -> Value {
        json!({
            "id": id,
            "email": email,
            "full_name": full_name,
            "role": role,
            "is_active": true,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn teacher_row(id: &str, user_id: &str, subject: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "branch": "Main Campus",
            "subject": subject,
            "bio": null,
            "phone": null,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn parent_row(id: &str, user_id: &str, student_name: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "student_name": student_name,
            "student_class": "5B",
            "phone": null,
            "notes": null,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn slot_row(
        id: &str,
        teacher_id: &str,
        day_of_week: i32,
        start_time: &str,
        end_time: &str,
        week_start_date: &str,
        is_booked: bool,
    ) -> Value {
        json!({
            "id": id,
            "teacher_id": teacher_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
            "week_start_date": week_start_date,
            "is_booked": is_booked,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn appointment_row(
        id: &str,
        parent_id: &str,
        teacher_id: &str,
        slot_id: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "parent_id": parent_id,
            "teacher_id": teacher_id,
            "slot_id": slot_id,
            "meeting_mode": "online",
            "status": status,
            "notes": null,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn notification_row(id: &str, appointment_id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "recipient_email": "parent@example.com",
            "recipient_name": "Test Parent",
            "notification_type": "appointment_confirmation",
            "status": status,
            "subject": "Appointment confirmed",
            "content": "Your appointment has been booked.",
            "appointment_id": appointment_id,
            "sent_at": null,
            "error_message": null,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn lock_row(lock_key: &str, slot_id: &str) -> Value {
        json!({
            "lock_key": lock_key,
            "slot_id": slot_id,
            "acquired_at": "2026-01-05T08:00:00Z",
            "expires_at": "2099-01-01T00:00:00Z",
            "process_id": "test-process"
        })
    }
}
