//! SwipeBot Telegram Bot
//!
//! A Telegram front-end for the Swipe apartment marketplace. This library
//! provides the session-aware API client, the conversation flow engine,
//! the paginated listings browser and multi-language support.

pub mod api;
pub mod config;
pub mod database;
pub mod handlers;
pub mod i18n;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{ApiError, Result, SwipeBotError};

// Re-export main components for easy access
pub use api::SwipeApiClient;
pub use i18n::I18n;
pub use services::{ServiceFactory, SessionManager};
pub use state::{FlowRegistry, StateStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
