//! Registration flow effects
//!
//! Registration is a two-phase exchange: submitting the profile creates a
//! pending account and emails a confirmation code; verifying the code
//! activates the account, after which the bot logs the user in with the
//! password collected earlier.

use teloxide::Bot;
use teloxide::types::ChatId;
use tracing::{info, warn};

use crate::i18n::I18n;
use crate::models::{RegistrationRequest, User};
use crate::services::ServiceFactory;
use crate::state::{ConversationContext, FlowRegistry, FlowStep};
use crate::utils::errors::Result;

use super::engine;

fn collected_registration(ctx: &ConversationContext) -> Option<RegistrationRequest> {
    Some(RegistrationRequest {
        first_name: ctx.get_string("first_name")?,
        last_name: ctx.get_string("last_name")?,
        email: ctx.get_string("email")?,
        phone: ctx.get_string("phone")?,
        password: ctx.get_string("password")?,
    })
}

/// Submit the collected profile; on success continue to the code step
#[allow(clippy::too_many_arguments)]
pub(super) async fn submit_registration(
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
    let Some(request) = collected_registration(ctx) else {
        warn!(user_id = ctx.user_id, "Registration flow finished with missing fields");
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &i18n.t("errors.unknown", lang, None))
            .await;
    };

    match services.session.api().register(&request).await {
        Ok(_) => {
            info!(user_id = ctx.user_id, "Registration submitted, awaiting code");
            let Some(next_id) = step.next else {
                let note = i18n.t("errors.unknown", lang, None);
                return engine::exit_flow(
                    bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note,
                )
                .await;
            };
            engine::continue_to(bot, chat_id, ctx, i18n, lang, registry, flow, next_id).await
        }
        Err(error) if error.is_conflict() => {
            // The email is already taken; restarting the flow would loop,
            // so surface the message and return to the menu.
            info!(user_id = ctx.user_id, "Registration conflict, leaving flow");
            let note = engine::api_error_note(i18n, lang, &error);
            engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note).await
        }
        Err(error) => {
            info!(user_id = ctx.user_id, error = %error, "Registration rejected");
            let note = engine::api_error_note(i18n, lang, &error);
            engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await
        }
    }
}

/// Verify the emailed code, then log in with the collected credentials
#[allow(clippy::too_many_arguments)]
pub(super) async fn verify_and_login(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    step: &FlowStep,
) -> Result<()> {
    let (Some(email), Some(password), Some(code)) = (
        ctx.get_string("email"),
        ctx.get_string("password"),
        ctx.get_string("code"),
    ) else {
        return engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &i18n.t("errors.unknown", lang, None))
            .await;
    };

    if let Err(error) = services.session.api().verify_registration(&email, &code).await {
        info!(user_id = ctx.user_id, error = %error, "Registration code rejected");
        let note = engine::api_error_note(i18n, lang, &error);
        return engine::render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
    }

    match services.session.api().login(&email, &password).await {
        Ok(tokens) => {
            services.session.store_login(user, tokens).await?;
            info!(user_id = ctx.user_id, "Registration verified and logged in");
            engine::exit_flow(bot, chat_id, ctx, i18n, lang, true, &i18n.t("flows.registration.success", lang, None)).await
        }
        Err(error) => {
            // Account is active but the follow-up login failed; the user can
            // log in manually from the menu.
            warn!(user_id = ctx.user_id, error = %error, "Post-registration login failed");
            let note = engine::api_error_note(i18n, lang, &error);
            engine::exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note).await
        }
    }
}
