use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::router::directory_routes;
use directory_cell::services::{DirectoryService, DirectorySeedService};
use shared_config::AppConfig;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn create_test_app(config: AppConfig) -> Router {
    directory_routes(Arc::new(config))
}

fn mock_config(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

#[tokio::test]
async fn test_list_departments() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let app = create_test_app(config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/departments"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::department_row(2, "Cardiology"),
            MockSupabaseResponses::department_row(1, "General Medicine")
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/departments")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let departments = json_response["departments"].as_array().unwrap();
    assert_eq!(departments.len(), 2);
    assert_eq!(departments[0]["name"], "Cardiology");
    assert_eq!(departments[1]["name"], "General Medicine");
}

#[tokio::test]
async fn test_list_doctors_for_department() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let app = create_test_app(config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("department_id", "eq.2"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row("CA001", "Dr. Emily Davis", 2),
            MockSupabaseResponses::doctor_row("CA002", "Dr. Robert Wilson", 2)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/departments/2/doctors")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let doctors = json_response["doctors"].as_array().unwrap();
    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0]["id"], "CA001");
    assert_eq!(doctors[1]["id"], "CA002");
}

#[tokio::test]
async fn test_unknown_department_yields_empty_list() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let app = create_test_app(config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/departments/99/doctors")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json_response["doctors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_seed_populates_empty_directory() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let seeder = DirectorySeedService::new(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::department_row(1, "General Medicine")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::doctor_row("GM001", "Dr. John Smith", 1)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seeded = seeder.seed_if_empty().await.unwrap();
    assert!(seeded);

    // Both inserts were batch POSTs
    let posts: Vec<_> = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect();
    assert_eq!(posts.len(), 2);

    let departments: serde_json::Value = serde_json::from_slice(&posts[0].body).unwrap();
    assert_eq!(departments.as_array().unwrap().len(), 10);
    let doctors: serde_json::Value = serde_json::from_slice(&posts[1].body).unwrap();
    assert_eq!(doctors.as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn test_seed_skips_when_data_exists() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let seeder = DirectorySeedService::new(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&mock_server)
        .await;

    let seeded = seeder.seed_if_empty().await.unwrap();
    assert!(!seeded);

    let posts = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 0);
}

#[tokio::test]
async fn test_doctor_lookup_keeps_hostile_code_inside_the_filter() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let service = DirectoryService::new(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // A code carrying query syntax must stay a literal filter value, not
    // append its own parameters to the request.
    let doctor = service.get_doctor("CA001&limit=0").await.unwrap();
    assert!(doctor.is_none());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let pairs: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("id".to_string(), "eq.CA001&limit=0".to_string())));
    assert!(!pairs.iter().any(|(k, _)| k == "limit"));
}
