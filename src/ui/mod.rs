//! UI module
//!
//! Window tracking/replacement and keyboard builders

pub mod keyboards;
pub mod window;

// Re-export commonly used UI components
pub use window::{replace_window, retire_messages, UiWindow};
