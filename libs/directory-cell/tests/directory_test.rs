// libs/directory-cell/tests/directory_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::models::{CreateUserRequest, DirectoryError, UserRole};
use directory_cell::services::directory::DirectoryService;
use shared_utils::test_utils::{MockDataRows, TestConfig};

fn service(mock_server: &MockServer) -> DirectoryService {
    DirectoryService::new(&TestConfig::with_database_url(&mock_server.uri()).to_app_config())
}

#[tokio::test]
async fn create_user_rejects_taken_email() {
    let mock_server = MockServer::start().await;
    let existing_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::user_row(&existing_id, "taken@example.com", "Someone Else", "parent")
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create_user(CreateUserRequest {
            email: "taken@example.com".to_string(),
            full_name: Some("New Person".to_string()),
            role: UserRole::Parent,
        })
        .await;

    assert_matches!(result, Err(DirectoryError::EmailTaken(_)));
}

#[tokio::test]
async fn create_user_inserts_when_email_is_free() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockDataRows::user_row(&user_id, "new@example.com", "New Person", "teacher")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let user = service(&mock_server)
        .create_user(CreateUserRequest {
            email: "new@example.com".to_string(),
            full_name: Some("New Person".to_string()),
            role: UserRole::Teacher,
        })
        .await
        .unwrap();

    assert_eq!(user.email, "new@example.com");
    assert_eq!(user.role, UserRole::Teacher);
    assert!(user.is_active);
}

#[tokio::test]
async fn get_missing_teacher_returns_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/teachers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server).get_teacher(Uuid::new_v4()).await;
    assert_matches!(result, Err(DirectoryError::NotFound("Teacher")));
}

#[tokio::test]
async fn duplicate_parent_profile_is_rejected() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/parents"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockDataRows::parent_row(&Uuid::new_v4().to_string(), &user_id.to_string(), "Alex Doe")
        ])))
        .mount(&mock_server)
        .await;

    let result = service(&mock_server)
        .create_parent(directory_cell::models::CreateParentRequest {
            user_id,
            student_name: "Alex Doe".to_string(),
            student_class: Some("5B".to_string()),
            phone: None,
            notes: None,
        })
        .await;

    assert_matches!(result, Err(DirectoryError::ProfileExists(_)));
}
