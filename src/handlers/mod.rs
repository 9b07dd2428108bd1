//! Bot handlers module
//!
//! All Telegram update handlers organized by type:
//! - Command handlers for bot commands
//! - Callback handlers for inline keyboard interactions
//! - Message handlers for text, photo and location messages
//! - The flow engine and per-flow effects

pub mod callbacks;
pub mod commands;
pub mod flows;
pub mod messages;

pub use callbacks::handle_callback_query;
pub use messages::handle_message;

use crate::i18n::I18n;
use crate::models::User;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

/// Resolve the stored user for a Telegram account, creating the row on
/// first contact with the language detected from the client locale.
pub(crate) async fn resolve_user(
    services: &ServiceFactory,
    i18n: &I18n,
    tg_user: &teloxide::types::User,
) -> Result<User> {
    let detected = i18n.detect_user_language(tg_user.language_code.as_deref());
    services
        .user_service
        .ensure_user(
            tg_user.id.0 as i64,
            tg_user.username.clone(),
            Some(tg_user.first_name.clone()),
            tg_user.last_name.clone(),
            detected,
        )
        .await
}
