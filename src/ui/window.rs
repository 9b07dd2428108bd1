//! UI window tracking and replacement
//!
//! The bot keeps exactly one interactive "window" per chat: a control
//! message (prompt or menu with its keyboard), zero or more content
//! messages (listing cards) and an optional auxiliary message (the map
//! location). Replacement always retires the old messages before rendering
//! the new ones, so the two windows never coexist in the chat. Deletion is
//! best-effort: Telegram refuses to delete old messages and the window must
//! survive that.

use serde::{Deserialize, Serialize};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyMarkup};
use tracing::{debug, warn};

use crate::utils::errors::Result;

/// Message IDs making up the currently rendered window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiWindow {
    /// The control message: current prompt or menu
    pub control: Option<i32>,
    /// Content messages, e.g. listing cards on the current page
    #[serde(default)]
    pub content: Vec<i32>,
    /// Auxiliary message, e.g. a map location under the nav keyboard
    pub aux: Option<i32>,
}

impl UiWindow {
    /// Drain every tracked message ID
    pub fn take_all(&mut self) -> Vec<i32> {
        let mut ids = Vec::new();
        if let Some(id) = self.control.take() {
            ids.push(id);
        }
        ids.append(&mut self.content);
        if let Some(id) = self.aux.take() {
            ids.push(id);
        }
        ids
    }

    /// Drain the content and aux messages, keeping the control
    pub fn take_content_and_aux(&mut self) -> Vec<i32> {
        let mut ids = std::mem::take(&mut self.content);
        if let Some(id) = self.aux.take() {
            ids.push(id);
        }
        ids
    }

    /// Drain only the aux message
    pub fn take_aux(&mut self) -> Vec<i32> {
        self.aux.take().into_iter().collect()
    }
}

/// Best-effort deletion of retired messages
pub async fn retire_messages(bot: &Bot, chat_id: ChatId, ids: Vec<i32>) {
    for id in ids {
        if let Err(e) = bot.delete_message(chat_id, MessageId(id)).await {
            // Messages older than 48h cannot be deleted; not fatal
            debug!(chat_id = chat_id.0, message_id = id, error = %e, "Failed to delete message");
        }
    }
}

/// Replace the whole window with a new control message.
///
/// The old messages are retired first, then the new control is sent with one
/// retry on failure.
pub async fn replace_window(
    bot: &Bot,
    chat_id: ChatId,
    window: &mut UiWindow,
    text: &str,
    markup: Option<ReplyMarkup>,
) -> Result<()> {
    let retired = window.take_all();
    retire_messages(bot, chat_id, retired).await;

    let sent = match send_control(bot, chat_id, text, markup.clone()).await {
        Ok(message) => message,
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "Control message send failed, retrying once");
            send_control(bot, chat_id, text, markup).await?
        }
    };
    window.control = Some(sent.id.0);
    Ok(())
}

async fn send_control(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    markup: Option<ReplyMarkup>,
) -> Result<Message> {
    let mut request = bot.send_message(chat_id, text);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    Ok(request.await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_all_drains_everything() {
        let mut window = UiWindow {
            control: Some(1),
            content: vec![2, 3],
            aux: Some(4),
        };
        assert_eq!(window.take_all(), vec![1, 2, 3, 4]);
        assert_eq!(window, UiWindow::default());
    }

    #[test]
    fn test_take_content_and_aux_keeps_control() {
        let mut window = UiWindow {
            control: Some(1),
            content: vec![2, 3],
            aux: Some(4),
        };
        assert_eq!(window.take_content_and_aux(), vec![2, 3, 4]);
        assert_eq!(window.control, Some(1));
    }

    #[test]
    fn test_take_aux_only() {
        let mut window = UiWindow {
            control: Some(1),
            content: vec![2],
            aux: Some(4),
        };
        assert_eq!(window.take_aux(), vec![4]);
        assert_eq!(window.content, vec![2]);
        assert_eq!(window.control, Some(1));
    }
}
