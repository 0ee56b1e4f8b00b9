// libs/slot-cell/tests/slots_api_test.rs
//
// Router-level tests with the data API mocked at the HTTP boundary.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{MockDataRows, TestConfig};
use slot_cell::router::slot_routes;

const WEEK: &str = "2026-03-02"; // a Monday

async fn test_app(mock_server: &MockServer) -> Router {
    let config = TestConfig::with_database_url(&mock_server.uri());
    slot_routes(config.to_arc())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn mock_teacher_lookup(mock_server: &MockServer, teacher_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/teachers"))
        .and(query_param("id", format!("eq.{}", teacher_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::teacher_row(teacher_id, &Uuid::new_v4().to_string(), "Mathematics")
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn create_slot_persists_validated_candidate() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();
    let slot_id = Uuid::new_v4().to_string();

    mock_teacher_lookup(&mock_server, &teacher_id).await;

    // No competing slots this week
    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockDataRows::slot_row(&slot_id, &teacher_id, 0, "09:00:00", "09:30:00", WEEK, false)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    let response = app
        .oneshot(post(
            "/",
            json!({
                "teacher_id": teacher_id,
                "day_of_week": 0,
                "start_time": "09:00:00",
                "end_time": "09:30:00",
                "week_start_date": WEEK
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], slot_id);
    assert_eq!(body["is_booked"], false);
}

#[tokio::test]
async fn create_slot_conflict_returns_409_naming_existing_slot() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();
    let existing_id = Uuid::new_v4().to_string();

    mock_teacher_lookup(&mock_server, &teacher_id).await;

    // Existing Monday slot [09:00, 10:00)
    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::slot_row(&existing_id, &teacher_id, 0, "09:00:00", "10:00:00", WEEK, false)
        ])))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    // Candidate [09:30, 10:30) on the same day and week
    let response = app
        .oneshot(post(
            "/",
            json!({
                "teacher_id": teacher_id,
                "day_of_week": 0,
                "start_time": "09:30:00",
                "end_time": "10:30:00",
                "week_start_date": WEEK
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains(&existing_id));
}

#[tokio::test]
async fn create_slot_with_inverted_times_returns_400() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server).await;

    let response = app
        .oneshot(post(
            "/",
            json!({
                "teacher_id": Uuid::new_v4().to_string(),
                "day_of_week": 0,
                "start_time": "10:00:00",
                "end_time": "09:00:00",
                "week_start_date": WEEK
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_booked_slot_returns_409() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();
    let slot_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::slot_row(&slot_id, &teacher_id, 0, "09:00:00", "09:30:00", WEEK, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/{}", slot_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_unbooked_slot_succeeds() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();
    let slot_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::slot_row(&slot_id, &teacher_id, 0, "09:00:00", "09:30:00", WEEK, false)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/{}", slot_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn smart_create_skips_conflicts_and_reports_summary() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();
    let existing_id = Uuid::new_v4().to_string();

    // Existing Monday slot [09:00, 09:30) collides with the first generated hour
    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::slot_row(&existing_id, &teacher_id, 0, "09:00:00", "09:30:00", WEEK, false)
        ])))
        .mount(&mock_server)
        .await;

    // The bulk insert returns the three surviving rows
    Mock::given(method("POST"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockDataRows::slot_row(&Uuid::new_v4().to_string(), &teacher_id, 0, "10:00:00", "11:00:00", WEEK, false),
            MockDataRows::slot_row(&Uuid::new_v4().to_string(), &teacher_id, 2, "09:00:00", "10:00:00", WEEK, false),
            MockDataRows::slot_row(&Uuid::new_v4().to_string(), &teacher_id, 2, "10:00:00", "11:00:00", WEEK, false),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    let response = app
        .oneshot(post(
            "/smart/create",
            json!({
                "teacher_id": teacher_id,
                "days_of_week": [0, 2],
                "start_time": "09:00:00",
                "end_time": "11:00:00",
                "meeting_duration_minutes": 60,
                "week_start_date": WEEK
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["summary"]["total_created"], 3);
    assert_eq!(body["summary"]["total_skipped"], 1);
    assert!(body["summary"]["conflicts"][0]
        .as_str()
        .unwrap()
        .contains("Monday"));
}

#[tokio::test]
async fn smart_preview_does_not_persist_anything() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Any write would be a contract violation
    Mock::given(method("POST"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    let response = app
        .oneshot(post(
            "/smart/preview",
            json!({
                "teacher_id": teacher_id,
                "days_of_week": [0, 1],
                "start_time": "09:00:00",
                "end_time": "10:30:00",
                "meeting_duration_minutes": 30,
                "week_start_date": WEEK
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_slots"], 6);
    assert_eq!(body["slots_per_day"], 3);
    assert_eq!(body["days"], json!(["Monday", "Tuesday"]));
    assert_eq!(body["total_hours"], 3.0);
}

#[tokio::test]
async fn weekly_schedule_groups_by_day_and_counts_booked() {
    let mock_server = MockServer::start().await;
    let teacher_id = Uuid::new_v4().to_string();

    mock_teacher_lookup(&mock_server, &teacher_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/available_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::slot_row(&Uuid::new_v4().to_string(), &teacher_id, 0, "09:00:00", "09:30:00", WEEK, true),
            MockDataRows::slot_row(&Uuid::new_v4().to_string(), &teacher_id, 0, "09:30:00", "10:00:00", WEEK, false),
            MockDataRows::slot_row(&Uuid::new_v4().to_string(), &teacher_id, 3, "14:00:00", "14:30:00", WEEK, false),
        ])))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server).await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/teacher/{}/schedule?week_start={}", teacher_id, WEEK))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_slots"], 3);
    assert_eq!(body["available_slots"], 2);
    assert_eq!(body["booked_slots"], 1);
    assert_eq!(body["slots_by_day"]["0"].as_array().unwrap().len(), 2);
    assert_eq!(body["slots_by_day"]["3"].as_array().unwrap().len(), 1);
}
