//! Listing creation flow effect
//!
//! Collected photos are downloaded from Telegram and re-encoded as base64,
//! then the listing is submitted through the session manager so an expired
//! access token is refreshed transparently.

use teloxide::Bot;
use teloxide::types::ChatId;
use tracing::{info, warn};

use crate::i18n::I18n;
use crate::models::{CreateAnnouncementRequest, User};
use crate::services::ServiceFactory;
use crate::state::{ConversationContext, FlowStep};
use crate::utils::errors::{Result, SwipeBotError};
use crate::utils::images::encode_photo_to_base64;

use super::engine;

/// Brokered contact is the only channel the bot offers
const COMMUNICATION_METHOD: &str = "telegram";

fn collected_listing(ctx: &ConversationContext, images: Vec<String>) -> Option<CreateAnnouncementRequest> {
    Some(CreateAnnouncementRequest {
        address: ctx.get_string("address")?,
        apartment_number: ctx.get_string("apartment_number")?,
        price: ctx.get_f64("price")?,
        area: ctx.get_f64("area")?,
        description: ctx.get_string("description")?,
        latitude: ctx.get_string("latitude")?,
        longitude: ctx.get_string("longitude")?,
        images,
        number_of_rooms: ctx.get_f64("number_of_rooms").map(|n| n.to_string())?,
        communication_method: COMMUNICATION_METHOD.to_string(),
    })
}

#[allow(clippy::too_many_arguments)]
pub(super) async fn submit_listing(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    step: &FlowStep,
) -> Result<()> {
    if !user.is_authenticated() {
        let note = i18n.t("errors.not_logged_in", lang, None);
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, false, &note).await;
    }

    let file_ids = ctx.get_string_list(step.field.unwrap_or("images"));
    let mut images = Vec::with_capacity(file_ids.len());
    for file_id in &file_ids {
        match encode_photo_to_base64(bot, file_id).await {
            Ok(encoded) => images.push(encoded),
            Err(e) => {
                // The collected photos stay in the context; the user can
                // press Done again once Telegram recovers.
                warn!(user_id = ctx.user_id, file_id = %file_id, error = %e, "Photo download failed");
                let note = i18n.t("errors.api_unavailable", lang, None);
                return engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
            }
        }
    }

    let Some(payload) = collected_listing(ctx, images) else {
        warn!(user_id = ctx.user_id, "Listing flow finished with missing fields");
        let note = i18n.t("errors.unknown", lang, None);
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, true, &note).await;
    };

    let result = services
        .session
        .invoke(user, |api, token| {
            let payload = payload.clone();
            async move { api.create_announcement(token.as_deref(), &payload).await }
        })
        .await;

    match result {
        Ok(_) => {
            info!(user_id = ctx.user_id, "Listing published");
            let note = i18n.t("flows.create_listing.success", lang, None);
            engine::exit_flow(bot, chat_id, ctx, i18n, lang, true, &note).await
        }
        Err(SwipeBotError::Api(error)) => {
            info!(user_id = ctx.user_id, error = %error, "Listing rejected");
            if matches!(error, crate::utils::errors::ApiError::SessionExpired) {
                let note = engine::api_error_note(i18n, lang, &error);
                return engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note)
                    .await;
            }
            let note = engine::api_error_note(i18n, lang, &error);
            engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await
        }
        Err(e) => Err(e),
    }
}
