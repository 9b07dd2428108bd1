//! Bot user model
//!
//! A user record pairs the Telegram identity with the Swipe API credential
//! pair. The token columns are mutated only by the session manager (refresh,
//! login) or by explicit logout.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: String,
    pub api_access_token: Option<String>,
    pub api_refresh_token: Option<String>,
    pub api_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user holds a (possibly stale) API session
    pub fn is_authenticated(&self) -> bool {
        self.api_access_token.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}
