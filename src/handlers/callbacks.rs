//! Callback query handlers
//!
//! Routes `prefix:action` callback data from inline keyboards: `menu:*` for
//! the main menu, `lang:*` for the language picker and `lst:*` for the
//! listings browser.

use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, ReplyMarkup};
use tracing::{debug, warn};

use crate::i18n::I18n;
use crate::models::BrowseMode;
use crate::services::ServiceFactory;
use crate::state::flows::{FLOW_CREATE_LISTING, FLOW_LOGIN, FLOW_REGISTRATION, FLOW_RESET_PASSWORD};
use crate::state::{FlowRegistry, StateStorage};
use crate::ui::{keyboards, replace_window};
use crate::utils::errors::Result;

use super::commands::{perform_logout, render_profile};
use super::flows::{self, listings};
use super::resolve_user;

/// Main callback query dispatcher
pub async fn handle_callback_query(
    bot: Bot,
    query: CallbackQuery,
    services: ServiceFactory,
    state_storage: StateStorage,
    i18n: I18n,
    registry: FlowRegistry,
) -> Result<()> {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };

    // Answer first to clear the client's loading state
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %e, "Failed to answer callback query");
    }

    let mut user = resolve_user(&services, &i18n, &query.from).await?;
    let lang = user.language_code.clone();
    let user_id = user.telegram_id;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    let mut ctx = state_storage.load_or_create(user_id).await?;
    let parts: Vec<&str> = data.split(':').collect();
    debug!(user_id, callback = %data, "Callback received");

    match (parts.first().copied(), parts.get(1).copied()) {
        (Some("menu"), Some(action)) => match action {
            "login" => {
                flows::start_flow(&bot, chat_id, &mut ctx, &i18n, &lang, &registry, FLOW_LOGIN).await?
            }
            "register" => {
                flows::start_flow(&bot, chat_id, &mut ctx, &i18n, &lang, &registry, FLOW_REGISTRATION)
                    .await?
            }
            "reset" => {
                flows::start_flow(
                    &bot, chat_id, &mut ctx, &i18n, &lang, &registry, FLOW_RESET_PASSWORD,
                )
                .await?
            }
            "create" => {
                if user.is_authenticated() {
                    flows::start_flow(
                        &bot, chat_id, &mut ctx, &i18n, &lang, &registry, FLOW_CREATE_LISTING,
                    )
                    .await?
                } else {
                    // Stale keyboard from before a logout
                    let note = i18n.t("errors.not_logged_in", &lang, None);
                    flows::engine::show_menu(&bot, chat_id, &mut ctx, &i18n, &lang, false, &note)
                        .await?
                }
            }
            "listings" => {
                listings::open(
                    &bot, chat_id, &mut ctx, &mut user, &services, &i18n, &lang, BrowseMode::All,
                )
                .await?
            }
            "my_listings" => {
                listings::open(
                    &bot, chat_id, &mut ctx, &mut user, &services, &i18n, &lang, BrowseMode::Mine,
                )
                .await?
            }
            "profile" => render_profile(&bot, chat_id, &mut ctx, &mut user, &services, &i18n).await?,
            "logout" => perform_logout(&bot, chat_id, &mut ctx, &mut user, &services, &i18n).await?,
            "language" => {
                ctx.clear_flow();
                replace_window(
                    &bot,
                    chat_id,
                    &mut ctx.window,
                    &i18n.t("language.prompt", &lang, None),
                    Some(ReplyMarkup::InlineKeyboard(keyboards::language_menu())),
                )
                .await?
            }
            _ => warn!(user_id, action, "Unknown menu action"),
        },
        (Some("lang"), Some(code)) => {
            if i18n.is_language_supported(code) {
                services.user_service.set_language(user_id, code).await?;
                let note = i18n.t("language.changed", code, None);
                flows::engine::show_menu(
                    &bot,
                    chat_id,
                    &mut ctx,
                    &i18n,
                    code,
                    user.is_authenticated(),
                    &note,
                )
                .await?;
            } else {
                warn!(user_id, code, "Unsupported language requested");
            }
        }
        (Some("lst"), Some(action)) => match action {
            "next" => {
                listings::next_page(&bot, chat_id, &mut ctx, &mut user, &services, &i18n, &lang)
                    .await?
            }
            "prev" => {
                listings::prev_page(&bot, chat_id, &mut ctx, &mut user, &services, &i18n, &lang)
                    .await?
            }
            "geo" => match listings::parse_geo_target(&parts) {
                Some(listing_id) => {
                    listings::show_geo(&bot, chat_id, &mut ctx, &i18n, &lang, listing_id).await?
                }
                None => warn!(user_id, callback = %data, "Malformed geo callback"),
            },
            "exit" => listings::exit(&bot, chat_id, &mut ctx, &user, &i18n, &lang).await?,
            _ => warn!(user_id, action, "Unknown listings action"),
        },
        _ => warn!(user_id, callback = %data, "Unknown callback format"),
    }

    state_storage.save_context(&ctx).await
}
