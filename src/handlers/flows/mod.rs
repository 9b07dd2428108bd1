//! Conversation flows
//!
//! The generic engine interprets the flow table; per-flow effect handlers
//! perform the backend calls. The listings browser is a separate,
//! callback-driven view.

pub mod auth;
pub mod engine;
pub mod listing_create;
pub mod listings;
pub mod registration;

pub use engine::{classify_control, handle_flow_message, start_flow, Control};
