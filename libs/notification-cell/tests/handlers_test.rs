// libs/notification-cell/tests/handlers_test.rs
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::router::notification_routes;
use shared_utils::test_utils::{MockDataRows, TestConfig};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn lists_notifications_for_an_appointment() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("appointment_id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::notification_row(&Uuid::new_v4().to_string(), &appointment_id, "sent"),
            MockDataRows::notification_row(&Uuid::new_v4().to_string(), &appointment_id, "pending"),
        ])))
        .mount(&mock_server)
        .await;

    let app = notification_routes(TestConfig::with_database_url(&mock_server.uri()).to_arc());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/?appointment_id={}", appointment_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["notifications"][0]["status"], "sent");
}

#[tokio::test]
async fn missing_notification_returns_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = notification_routes(TestConfig::with_database_url(&mock_server.uri()).to_arc());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
