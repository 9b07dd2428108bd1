//! Login and password-reset flow effects

use teloxide::Bot;
use teloxide::types::ChatId;
use tracing::{info, warn};

use crate::i18n::I18n;
use crate::models::User;
use crate::services::ServiceFactory;
use crate::state::{ConversationContext, FlowRegistry, FlowStep};
use crate::utils::errors::Result;

use super::engine;

/// Terminal effect of the login flow: exchange credentials for a token pair
#[allow(clippy::too_many_arguments)]
pub(super) async fn submit_login(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    step: &FlowStep,
) -> Result<()> {
    let (Some(email), Some(password)) = (ctx.get_string("email"), ctx.get_string("password"))
    else {
        warn!(user_id = ctx.user_id, "Login flow finished without collected credentials");
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &i18n.t("errors.unknown", lang, None))
            .await;
    };

    match services.session.api().login(&email, &password).await {
        Ok(tokens) => {
            services.session.store_login(user, tokens).await?;
            engine::exit_flow(bot, chat_id, ctx, i18n, lang, true, &i18n.t("flows.login.success", lang, None)).await
        }
        Err(error) => {
            info!(user_id = ctx.user_id, error = %error, "Login rejected");
            let note = engine::api_error_note(i18n, lang, &error);
            engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await
        }
    }
}

/// Mid-flow effect of the reset flow: ask the backend to email a reset code,
/// then continue to the code step.
#[allow(clippy::too_many_arguments)]
pub(super) async fn request_reset_code(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
    step: &FlowStep,
) -> Result<()> {
    let Some(email) = ctx.get_string("email") else {
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &i18n.t("errors.unknown", lang, None))
            .await;
    };

    match services.session.api().forgot_password(&email).await {
        Ok(_) => {
            let Some(next_id) = step.next else {
                let note = i18n.t("errors.unknown", lang, None);
                return engine::exit_flow(
                    bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note,
                )
                .await;
            };
            engine::continue_to(bot, chat_id, ctx, i18n, lang, registry, flow, next_id).await
        }
        Err(error) => {
            info!(user_id = ctx.user_id, error = %error, "Reset code request rejected");
            let note = engine::api_error_note(i18n, lang, &error);
            engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await
        }
    }
}

/// Terminal effect of the reset flow: set the new password
#[allow(clippy::too_many_arguments)]
pub(super) async fn submit_password_reset(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    step: &FlowStep,
) -> Result<()> {
    let (Some(token), Some(new_password)) =
        (ctx.get_string("token"), ctx.get_string("new_password"))
    else {
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &i18n.t("errors.unknown", lang, None))
            .await;
    };

    match services.session.api().reset_password(&token, &new_password).await {
        Ok(_) => {
            info!(user_id = ctx.user_id, "Password reset completed");
            engine::exit_flow(
                bot,
                chat_id,
                ctx,
                i18n,
                lang,
                user.is_authenticated(),
                &i18n.t("flows.reset_password.success", lang, None),
            )
            .await
        }
        Err(error) => {
            info!(user_id = ctx.user_id, error = %error, "Password reset rejected");
            let note = engine::api_error_note(i18n, lang, &error);
            engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await
        }
    }
}
