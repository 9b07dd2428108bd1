//! Swipe API HTTP client
//!
//! Low-level client for the Swipe marketplace API. Responses are classified
//! once, at this boundary: 401 → `Unauthorized`, other 4xx → `Rejected` with
//! the server-provided message, network/timeout/5xx/malformed body →
//! `Unavailable`. Retry policy lives in the session manager, never here.

use std::time::Duration;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::models::{
    Announcement, BrowseMode, CreateAnnouncementRequest, Profile, RegistrationRequest, TokenPair,
};
use crate::utils::errors::{ApiError, ApiResult, Result, SwipeBotError};

/// Client for the Swipe marketplace API
#[derive(Clone, Debug)]
pub struct SwipeApiClient {
    client: Client,
    base_url: String,
}

impl SwipeApiClient {
    /// Create a new client from injected configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent("SwipeBot/1.0")
            .build()
            .map_err(SwipeBotError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Execute a request and classify the outcome
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, authenticated = token.is_some(), "Swipe API request");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(method = %method, url = %url, status = %status, "Swipe API response");

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Unavailable(format!("malformed response body: {e}")));
        }

        let message = Self::extract_error_message(response).await;
        warn!(method = %method, url = %url, status = %status, message = %message, "Swipe API request failed");

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized(message)),
            s if s.is_client_error() => Err(ApiError::Rejected {
                status: s.as_u16(),
                message,
            }),
            s => Err(ApiError::Unavailable(format!("server error {s}: {message}"))),
        }
    }

    /// Pull the human-readable message field out of an error body
    async fn extract_error_message(response: reqwest::Response) -> String {
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text),
            Err(_) => text,
        }
    }

    // --- auth ---

    /// Authenticate a user
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<TokenPair> {
        self.request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Initiate user registration
    pub async fn register(&self, request: &RegistrationRequest) -> ApiResult<Value> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        self.request(Method::POST, "/auth/register", None, Some(body)).await
    }

    /// Verify a registration code
    pub async fn verify_registration(&self, email: &str, code: &str) -> ApiResult<Value> {
        self.request(
            Method::POST,
            "/auth/verify",
            None,
            Some(json!({ "email": email, "code": code })),
        )
        .await
    }

    /// Request a password reset code
    pub async fn forgot_password(&self, email: &str) -> ApiResult<Value> {
        self.request(
            Method::POST,
            "/auth/forgot-password",
            None,
            Some(json!({ "email": email })),
        )
        .await
    }

    /// Set a new password using a reset token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<Value> {
        self.request(
            Method::POST,
            "/auth/reset-password",
            None,
            Some(json!({ "token": token, "new_password": new_password })),
        )
        .await
    }

    /// Exchange a refresh token for a new credential pair
    pub async fn refresh_tokens(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        self.request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await
    }

    // --- users ---

    /// Retrieve the authenticated user's profile
    pub async fn get_my_profile(&self, token: Option<&str>) -> ApiResult<Profile> {
        self.request(Method::GET, "/users/me", token, None).await
    }

    // --- announcements ---

    /// Fetch a page of listings for the given mode
    pub async fn list_announcements(
        &self,
        token: Option<&str>,
        mode: BrowseMode,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<Announcement>> {
        let path = match mode {
            BrowseMode::All => format!("/announcements/?limit={limit}&offset={offset}"),
            BrowseMode::Mine => format!("/announcements/my?limit={limit}&offset={offset}"),
        };
        self.request(Method::GET, &path, token, None).await
    }

    /// Create a new listing
    pub async fn create_announcement(
        &self,
        token: Option<&str>,
        request: &CreateAnnouncementRequest,
    ) -> ApiResult<Value> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        self.request(Method::POST, "/announcements/", token, Some(body)).await
    }
}
