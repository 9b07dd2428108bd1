//! Utility modules
//!
//! Common helpers used throughout the application

pub mod errors;
pub mod images;
pub mod logging;

pub use errors::{ApiError, ApiResult, Result, SwipeBotError};
