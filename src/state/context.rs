//! Conversation context management
//!
//! Per-user conversation state: the flow the user is in, the step within it,
//! collected answers, the current UI window and the browsing cursor. The
//! context is the single unit of persistence — it is loaded at the start of
//! an update and saved back once, so a crash between updates never leaves a
//! half-written flow.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};

use crate::models::BrowseMode;
use crate::ui::UiWindow;

/// How long an abandoned flow survives before the context is dropped
const FLOW_TTL_HOURS: i64 = 1;

/// Cursor into the paginated listings view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Which collection is being browsed
    pub mode: BrowseMode,
    /// Offset of the first item on the current page
    pub offset: i64,
}

impl PageCursor {
    pub fn new(mode: BrowseMode) -> Self {
        Self { mode, offset: 0 }
    }
}

/// User conversation context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Telegram user ID this context belongs to
    pub user_id: i64,
    /// Current flow the user is in
    pub flow: Option<String>,
    /// Current step within the flow
    pub step: Option<String>,
    /// Answers collected so far, keyed by field name
    pub data: HashMap<String, serde_json::Value>,
    /// Message IDs making up the currently rendered window
    #[serde(default)]
    pub window: UiWindow,
    /// Browsing cursor, present only inside the listings view
    pub cursor: Option<PageCursor>,
    /// When this context expires (for cleanup)
    pub expires_at: Option<DateTime<Utc>>,
    /// When this context was last updated
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    /// Create a new conversation context for a user
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            flow: None,
            step: None,
            data: HashMap::new(),
            window: UiWindow::default(),
            cursor: None,
            expires_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Enter a flow at its first step, discarding any previous flow data
    pub fn start_flow(&mut self, flow: &str, first_step: &str) {
        self.flow = Some(flow.to_string());
        self.step = Some(first_step.to_string());
        self.data.clear();
        self.cursor = None;
        self.expires_at = Some(Utc::now() + Duration::hours(FLOW_TTL_HOURS));
        self.touch();
    }

    /// Move to another step of the current flow
    pub fn set_step(&mut self, step: &str) {
        self.step = Some(step.to_string());
        self.expires_at = Some(Utc::now() + Duration::hours(FLOW_TTL_HOURS));
        self.touch();
    }

    /// Leave the current flow, keeping the rendered window
    pub fn clear_flow(&mut self) {
        self.flow = None;
        self.step = None;
        self.data.clear();
        self.cursor = None;
        self.expires_at = None;
        self.touch();
    }

    /// Current (flow, step) pair, if the user is inside a flow
    pub fn position(&self) -> Option<(&str, &str)> {
        match (self.flow.as_deref(), self.step.as_deref()) {
            (Some(flow), Some(step)) => Some((flow, step)),
            _ => None,
        }
    }

    /// Store a collected answer
    pub fn set_data(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.to_string(), value);
        self.touch();
    }

    /// Remove a collected answer (used when stepping back)
    pub fn remove_data(&mut self, key: &str) {
        self.data.remove(key);
        self.touch();
    }

    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.data.get(key)?.as_str().map(str::to_string)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key)?.as_f64()
    }

    /// Append a string to a list-valued field (photo file IDs)
    pub fn push_string(&mut self, key: &str, value: String) -> usize {
        let list = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let serde_json::Value::Array(items) = list {
            items.push(serde_json::Value::String(value));
            let len = items.len();
            self.touch();
            return len;
        }
        0
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.data
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if this context has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_flow_resets_previous_data() {
        let mut ctx = ConversationContext::new(42);
        ctx.start_flow("login", "email");
        ctx.set_data("email", json!("a@b.c"));
        ctx.cursor = Some(PageCursor::new(BrowseMode::All));

        ctx.start_flow("registration", "first_name");

        assert_eq!(ctx.position(), Some(("registration", "first_name")));
        assert!(ctx.data.is_empty());
        assert!(ctx.cursor.is_none());
        assert!(ctx.expires_at.is_some());
    }

    #[test]
    fn test_clear_flow_keeps_window() {
        let mut ctx = ConversationContext::new(42);
        ctx.window.control = Some(7);
        ctx.start_flow("login", "email");
        ctx.clear_flow();

        assert!(ctx.position().is_none());
        assert_eq!(ctx.window.control, Some(7));
        assert!(ctx.expires_at.is_none());
    }

    #[test]
    fn test_push_string_accumulates() {
        let mut ctx = ConversationContext::new(42);
        assert_eq!(ctx.push_string("images", "file1".to_string()), 1);
        assert_eq!(ctx.push_string("images", "file2".to_string()), 2);
        assert_eq!(ctx.get_string_list("images"), vec!["file1", "file2"]);
    }

    #[test]
    fn test_expiry() {
        let mut ctx = ConversationContext::new(42);
        assert!(!ctx.is_expired());
        ctx.expires_at = Some(Utc::now() - Duration::minutes(1));
        assert!(ctx.is_expired());
    }
}
