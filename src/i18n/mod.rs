//! Internationalization module
//!
//! Multi-language support for the SwipeBot interface: translation loading,
//! language detection and message formatting.

pub mod loader;

// Re-export commonly used i18n components
pub use loader::{I18n, TranslationParams};
