//! Error handling for SwipeBot
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for the SwipeBot application
#[derive(Error, Debug)]
pub enum SwipeBotError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Telegram download error: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("Swipe API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Swipe backend API error taxonomy
///
/// Classification happens once, at the HTTP boundary:
/// - `Unauthorized` — a confirmed 401; the session layer may refresh and retry
/// - `SessionExpired` — both tokens unusable; the user must log in again
/// - `Rejected` — a well-formed non-auth 4xx carrying the server's message
/// - `Unavailable` — network failure, timeout, 5xx, or a malformed body
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("authorization failed: {0}")]
    Unauthorized(String),

    #[error("session expired")]
    SessionExpired,

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    /// HTTP conflict responses signal a definitive business-rule clash
    /// (e.g. an already-registered email) rather than a transient failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Rejected { status: 409, .. })
    }
}

/// Result type alias for SwipeBot operations
pub type Result<T> = std::result::Result<T, SwipeBotError>;

/// Result type alias for Swipe API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl SwipeBotError {
    /// Whether retrying the same user action could succeed; logged with
    /// every handler failure.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SwipeBotError::Database(_) => false,
            SwipeBotError::Migration(_) => false,
            SwipeBotError::Telegram(_) => true,
            SwipeBotError::Download(_) => true,
            SwipeBotError::Api(api) => matches!(api, ApiError::Unavailable(_)),
            SwipeBotError::Config(_) => false,
            SwipeBotError::Redis(_) => true,
            SwipeBotError::Http(_) => true,
            SwipeBotError::Serialization(_) => false,
            SwipeBotError::Io(_) => true,
            SwipeBotError::UrlParse(_) => false,
            SwipeBotError::InvalidInput(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        let conflict = ApiError::Rejected {
            status: 409,
            message: "already registered".to_string(),
        };
        assert!(conflict.is_conflict());

        let bad_request = ApiError::Rejected {
            status: 400,
            message: "invalid payload".to_string(),
        };
        assert!(!bad_request.is_conflict());
        assert!(!ApiError::SessionExpired.is_conflict());
    }

    #[test]
    fn test_recoverability() {
        let err: SwipeBotError = ApiError::Unavailable("timeout".to_string()).into();
        assert!(err.is_recoverable());

        let err: SwipeBotError = ApiError::SessionExpired.into();
        assert!(!err.is_recoverable());
    }
}
