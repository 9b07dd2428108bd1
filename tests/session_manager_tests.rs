//! Session manager tests
//!
//! Exercises the refresh-and-retry-once policy against a mock backend with
//! an in-memory credential store.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use swipebot::config::ApiConfig;
use swipebot::models::{TokenPair, User};
use swipebot::services::{CredentialStore, SessionManager};
use swipebot::utils::errors::{ApiError, Result, SwipeBotError};
use swipebot::SwipeApiClient;

/// Credential store backed by a mutex, standing in for the user repository
#[derive(Clone, Default)]
struct MemoryStore {
    tokens: Arc<Mutex<Option<(String, String)>>>,
    clears: Arc<Mutex<u32>>,
}

impl MemoryStore {
    fn stored(&self) -> Option<(String, String)> {
        self.tokens.lock().unwrap().clone()
    }

    fn clear_count(&self) -> u32 {
        *self.clears.lock().unwrap()
    }
}

impl CredentialStore for MemoryStore {
    async fn save_tokens(&self, _telegram_id: i64, tokens: &TokenPair) -> Result<()> {
        *self.tokens.lock().unwrap() =
            Some((tokens.access_token.clone(), tokens.refresh_token.clone()));
        Ok(())
    }

    async fn clear_tokens(&self, _telegram_id: i64) -> Result<()> {
        *self.tokens.lock().unwrap() = None;
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }
}

fn test_user(access: Option<&str>, refresh: Option<&str>) -> User {
    User {
        id: 1,
        telegram_id: 100,
        username: Some("tester".to_string()),
        first_name: Some("Test".to_string()),
        last_name: None,
        language_code: "en".to_string(),
        api_access_token: access.map(str::to_string),
        api_refresh_token: refresh.map(str::to_string),
        api_user_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn manager_for(server: &MockServer, store: MemoryStore) -> SessionManager<MemoryStore> {
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
        connect_timeout_seconds: 2,
    };
    let api = SwipeApiClient::new(&config).expect("client should build");
    SessionManager::new(api, store)
}

async fn mount_refresh(server: &MockServer, template: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(template)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_retried_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "first_name": "Test", "last_name": "User",
            "email": "a@b.c", "phone": "+380501234567"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh"
        })),
        1,
    )
    .await;

    let store = MemoryStore::default();
    let manager = manager_for(&server, store.clone());
    let mut user = test_user(Some("old-access"), Some("old-refresh"));

    let profile = manager
        .invoke(&mut user, |api, token| async move {
            api.get_my_profile(token.as_deref()).await
        })
        .await
        .unwrap();

    assert_eq!(profile.email, "a@b.c");
    assert_eq!(user.api_access_token.as_deref(), Some("new-access"));
    assert_eq!(user.api_refresh_token.as_deref(), Some("new-refresh"));
    assert_eq!(
        store.stored(),
        Some(("new-access".to_string(), "new-refresh".to_string()))
    );
}

#[tokio::test]
async fn failed_refresh_clears_credentials_and_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({"message": "refresh token revoked"})),
        1,
    )
    .await;

    let store = MemoryStore::default();
    let manager = manager_for(&server, store.clone());
    let mut user = test_user(Some("old-access"), Some("old-refresh"));

    let error = manager
        .invoke(&mut user, |api, token| async move {
            api.get_my_profile(token.as_deref()).await
        })
        .await
        .unwrap_err();

    assert_matches!(error, SwipeBotError::Api(ApiError::SessionExpired));
    assert!(user.api_access_token.is_none());
    assert!(user.api_refresh_token.is_none());
    assert_eq!(store.clear_count(), 1);
}

#[tokio::test]
async fn second_unauthorized_after_refresh_expires_session() {
    let server = MockServer::start().await;

    // Rejects both the old and the refreshed access token
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh"
        })),
        1,
    )
    .await;

    let store = MemoryStore::default();
    let manager = manager_for(&server, store.clone());
    let mut user = test_user(Some("old-access"), Some("old-refresh"));

    let error = manager
        .invoke(&mut user, |api, token| async move {
            api.get_my_profile(token.as_deref()).await
        })
        .await
        .unwrap_err();

    // Exactly one retry: the refreshed pair stays stored, the session is
    // reported expired rather than looping.
    assert_matches!(error, SwipeBotError::Api(ApiError::SessionExpired));
    assert_eq!(
        store.stored(),
        Some(("new-access".to_string(), "new-refresh".to_string()))
    );
}

#[tokio::test]
async fn unauthorized_without_refresh_token_skips_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "no token"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let store = MemoryStore::default();
    let manager = manager_for(&server, store.clone());
    let mut user = test_user(None, None);

    let error = manager
        .invoke(&mut user, |api, token| async move {
            api.get_my_profile(token.as_deref()).await
        })
        .await
        .unwrap_err();

    assert_matches!(error, SwipeBotError::Api(ApiError::SessionExpired));
    assert_eq!(store.clear_count(), 0);
}

#[tokio::test]
async fn non_auth_errors_pass_through_without_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "bad request"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let store = MemoryStore::default();
    let manager = manager_for(&server, store.clone());
    let mut user = test_user(Some("old-access"), Some("old-refresh"));

    let error = manager
        .invoke(&mut user, |api, token| async move {
            api.get_my_profile(token.as_deref()).await
        })
        .await
        .unwrap_err();

    assert_matches!(error, SwipeBotError::Api(ApiError::Rejected { status: 400, .. }));
    // Tokens untouched
    assert_eq!(user.api_access_token.as_deref(), Some("old-access"));
}
