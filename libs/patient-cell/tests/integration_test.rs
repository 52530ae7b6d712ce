use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::models::UpdateProfileRequest;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    patient_routes(Arc::new(config))
}

fn mock_config(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

fn get_profile_request(token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/profile")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_get_profile_returns_stored_row() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("alice");
    let config = mock_config(&mock_server);
    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&Uuid::new_v4().to_string(), &user.id, "Alice Byrne")
        ])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(get_profile_request(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json_response["name"], "Alice Byrne");
    assert_eq!(json_response["email"], "patient@example.com");
    assert_eq!(json_response["phone"], "0851234567");
}

#[tokio::test]
async fn test_first_profile_read_creates_placeholder_exactly_once() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("alice");
    let config = mock_config(&mock_server);
    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let patient_id = Uuid::new_v4().to_string();

    // First lookup misses, every later one finds the created row
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    let placeholder = json!({
        "id": patient_id,
        "user_id": user.id,
        "name": "Unnamed",
        "email": "",
        "phone": "",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    });

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([placeholder])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([placeholder])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // First read inserts the placeholder and returns it
    let response = app.clone().oneshot(get_profile_request(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json_response["name"], "Unnamed");
    assert_eq!(json_response["email"], "");

    // Second read is a plain lookup; the expect(1) on the POST mock
    // verifies no second insert happened
    let response = app.oneshot(get_profile_request(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_overwrites_existing_row() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("alice");
    let config = mock_config(&mock_server);
    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&patient_id, &user.id, "Unnamed")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": patient_id,
                "user_id": user.id,
                "name": "Alice Byrne",
                "email": "alice@example.com",
                "phone": "0861112222",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-02-01T00:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = UpdateProfileRequest {
        name: "Alice Byrne".to_string(),
        email: "alice@example.com".to_string(),
        phone: "0861112222".to_string(),
    };

    let request = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json_response["message"], "Profile updated successfully");
    assert_eq!(json_response["profile"]["name"], "Alice Byrne");
    assert_eq!(json_response["profile"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_update_profile_creates_row_when_absent() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("alice");
    let config = mock_config(&mock_server);
    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {
                "id": Uuid::new_v4().to_string(),
                "user_id": user.id,
                "name": "Alice Byrne",
                "email": "alice@example.com",
                "phone": "0861112222",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = UpdateProfileRequest {
        name: "Alice Byrne".to_string(),
        email: "alice@example.com".to_string(),
        phone: "0861112222".to_string(),
    };

    let request = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_requires_authentication() {
    let config = TestConfig::default().to_app_config();

    for method in ["GET", "PUT"] {
        let app = create_test_app(config.clone());
        let request = Request::builder()
            .method(method)
            .uri("/profile")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "Failed for {}", method);
    }
}
