//! Swipe API client tests
//!
//! Verifies response classification at the HTTP boundary against a mock
//! backend: success bodies, auth failures, business rejections and
//! unavailability.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use swipebot::config::ApiConfig;
use swipebot::models::BrowseMode;
use swipebot::utils::errors::ApiError;
use swipebot::SwipeApiClient;

fn client_for(server: &MockServer) -> SwipeApiClient {
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
        connect_timeout_seconds: 2,
    };
    SwipeApiClient::new(&config).expect("client should build")
}

#[tokio::test]
async fn login_returns_token_pair() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(json!({"email": "a@b.c", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc",
            "refresh_token": "ref"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tokens = client.login("a@b.c", "secret1").await.unwrap();
    assert_eq!(tokens.access_token, "acc");
    assert_eq!(tokens.refresh_token, "ref");
}

#[tokio::test]
async fn unauthorized_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "bad credentials"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.login("a@b.c", "wrong").await.unwrap_err();
    match error {
        ApiError::Unauthorized(message) => assert_eq!(message, "bad credentials"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn conflict_is_a_rejection_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "email already in use"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = swipebot::models::RegistrationRequest {
        first_name: "Jo".to_string(),
        last_name: "Doe".to_string(),
        email: "a@b.c".to_string(),
        phone: "+380501234567".to_string(),
        password: "secret1".to_string(),
    };
    let error = client.register(&request).await.unwrap_err();
    assert!(error.is_conflict());
    match error {
        ApiError::Rejected { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "email already in use");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_classify_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.get_my_profile(Some("token")).await.unwrap_err();
    assert!(matches!(error, ApiError::Unavailable(_)));
}

#[tokio::test]
async fn malformed_success_body_classifies_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.get_my_profile(Some("token")).await.unwrap_err();
    assert!(matches!(error, ApiError::Unavailable(_)));
}

#[tokio::test]
async fn listings_request_carries_pagination_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/announcements/"))
        .and(query_param("limit", "3"))
        .and(query_param("offset", "4"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "address": "Main St 1", "price": 100.0, "area": 40.0},
            {"id": 2, "address": "Main St 2", "price": 200.0, "area": 50.0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let items = client
        .list_announcements(Some("token-1"), BrowseMode::All, 3, 4)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].address, "Main St 1");
}

#[tokio::test]
async fn my_listings_use_the_owner_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/announcements/my"))
        .and(query_param("limit", "3"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let items = client
        .list_announcements(Some("token-1"), BrowseMode::Mine, 3, 0)
        .await
        .unwrap();
    assert!(items.is_empty());
}
