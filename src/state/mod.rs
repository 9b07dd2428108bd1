//! State management module
//!
//! Conversation state: the per-user context, its Redis persistence and the
//! declarative flow transition table.

pub mod context;
pub mod flows;
pub mod storage;

// Re-export commonly used state components
pub use context::{ConversationContext, PageCursor};
pub use flows::{FlowRegistry, FlowStep, InputKind, StepEffect, Validator};
pub use storage::StateStorage;
