// libs/notification-cell/tests/job_status_test.rs
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::models::{EmailJob, JobStatus};
use notification_cell::services::email::EmailClient;
use shared_config::AppConfig;

#[test]
fn new_jobs_start_queued_with_retry_budget() {
    let job = EmailJob::new(
        Uuid::new_v4(),
        "parent@example.com".to_string(),
        "Alex Doe".to_string(),
        "Appointment booked".to_string(),
        "Your appointment has been booked.".to_string(),
    );

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.retry_count, 0);
    assert_eq!(job.max_retries, 3);
    assert!(job.completed_at.is_none());
    assert!(job.worker_id.is_none());
}

#[test]
fn job_status_transitions_follow_the_worker_path() {
    use JobStatus::*;

    assert!(Queued.can_transition_to(&Processing));
    assert!(Processing.can_transition_to(&Sent));
    assert!(Processing.can_transition_to(&Retrying));
    assert!(Processing.can_transition_to(&Failed));
    assert!(Retrying.can_transition_to(&Processing));
    assert!(Retrying.can_transition_to(&Failed));

    // No resurrection of finished jobs, no skipping the processing step
    assert!(!Sent.can_transition_to(&Processing));
    assert!(!Failed.can_transition_to(&Processing));
    assert!(!Queued.can_transition_to(&Sent));
    assert!(!Queued.can_transition_to(&Failed));
}

#[test]
fn only_sent_and_failed_are_terminal() {
    assert!(JobStatus::Sent.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(!JobStatus::Queued.is_terminal());
    assert!(!JobStatus::Processing.is_terminal());
    assert!(!JobStatus::Retrying.is_terminal());
}

fn email_config(api_url: &str) -> AppConfig {
    AppConfig {
        database_url: String::new(),
        database_service_key: String::new(),
        redis_url: None,
        email_api_url: api_url.to_string(),
        email_api_token: "test-token".to_string(),
        email_from_address: "noreply@school-bookings.example".to_string(),
        notification_worker_count: 1,
    }
}

#[tokio::test]
async fn email_client_posts_to_the_send_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmailClient::new(&email_config(&mock_server.uri()));
    let result = client
        .send(
            "parent@example.com",
            "Alex Doe",
            "Appointment booked",
            "Your appointment has been booked.",
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn email_client_surfaces_api_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(503).set_body_string("downstream outage"))
        .mount(&mock_server)
        .await;

    let client = EmailClient::new(&email_config(&mock_server.uri()));
    let result = client
        .send("parent@example.com", "Alex Doe", "Subject", "Body")
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn unconfigured_email_client_degrades_to_noop() {
    let client = EmailClient::new(&email_config(""));
    let result = client
        .send("parent@example.com", "Alex Doe", "Subject", "Body")
        .await;

    assert!(result.is_ok());
}
