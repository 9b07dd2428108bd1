//! Message handlers
//!
//! Routes private-chat messages into the active flow; with no flow active
//! the menu is re-rendered so the user always has a way forward.

use teloxide::prelude::*;
use teloxide::types::Message;
use tracing::debug;

use crate::i18n::I18n;
use crate::services::ServiceFactory;
use crate::state::{FlowRegistry, StateStorage};
use crate::utils::errors::{Result, SwipeBotError};

use super::flows;
use super::resolve_user;

/// Handle incoming non-command messages
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    services: ServiceFactory,
    state_storage: StateStorage,
    i18n: I18n,
    registry: FlowRegistry,
) -> Result<()> {
    // The bot is a private-chat assistant; group noise is ignored
    if !msg.chat.id.is_user() {
        return Ok(());
    }

    let from = msg
        .from
        .as_ref()
        .ok_or_else(|| SwipeBotError::InvalidInput("No user in message".to_string()))?;

    let mut user = resolve_user(&services, &i18n, from).await?;
    let lang = user.language_code.clone();
    let mut ctx = state_storage.load_or_create(user.telegram_id).await?;

    debug!(user_id = user.telegram_id, flow = ?ctx.flow, step = ?ctx.step, "Message received");

    if ctx.position().is_some() {
        flows::handle_flow_message(&bot, &msg, &mut ctx, &mut user, &services, &i18n, &registry)
            .await?;
    } else {
        // Free-form text outside any flow: point back at the menu
        let title = i18n.t("menu.title", &lang, None);
        flows::engine::show_menu(
            &bot,
            msg.chat.id,
            &mut ctx,
            &i18n,
            &lang,
            user.is_authenticated(),
            &title,
        )
        .await?;
    }

    state_storage.save_context(&ctx).await
}
