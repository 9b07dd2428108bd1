//! Flow engine
//!
//! Interprets the flow transition table: classifies Back/Cancel/Done
//! controls, validates input, stores answers, moves between steps and fires
//! terminal effects. Flow-specific code lives only in the effect handlers.

use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, ReplyMarkup};
use tracing::{debug, info, warn};

use crate::i18n::{I18n, TranslationParams};
use crate::models::User;
use crate::services::ServiceFactory;
use crate::state::{ConversationContext, FlowRegistry, FlowStep, InputKind, StepEffect};
use crate::ui::{keyboards, replace_window};
use crate::utils::errors::{ApiError, Result};

use super::{auth, listing_create, registration};

/// Universal flow controls, recognized before any step logic runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Back,
    Cancel,
    Done,
}

/// Match text against the control button labels of every supported language,
/// so a mid-flow language switch never strands the user.
pub fn classify_control(i18n: &I18n, text: &str) -> Option<Control> {
    for lang in i18n.supported_languages() {
        if text == i18n.t("buttons.cancel", lang, None) {
            return Some(Control::Cancel);
        }
        if text == i18n.t("buttons.back", lang, None) {
            return Some(Control::Back);
        }
        if text == i18n.t("buttons.done", lang, None) {
            return Some(Control::Done);
        }
    }
    None
}

/// Enter a flow at its first step and render the prompt
pub async fn start_flow(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
) -> Result<()> {
    let Some(first) = registry.first_step(flow) else {
        warn!(flow, "Attempt to start unknown flow");
        return Ok(());
    };

    info!(user_id = ctx.user_id, flow, "Flow started");
    ctx.start_flow(flow, first.id);
    render_prompt(bot, chat_id, ctx, i18n, lang, first, None).await
}

/// Render a step prompt, replacing the current window.
/// `note` is a pre-translated line shown above the prompt (validation or
/// backend errors).
pub async fn render_prompt(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    step: &FlowStep,
    note: Option<String>,
) -> Result<()> {
    let prompt = i18n.t(step.prompt_key, lang, None);
    let text = match note {
        Some(note) => format!("{note}\n\n{prompt}"),
        None => prompt,
    };
    let markup = prompt_markup(i18n, lang, step);
    replace_window(bot, chat_id, &mut ctx.window, &text, Some(markup)).await
}

fn prompt_markup(i18n: &I18n, lang: &str, step: &FlowStep) -> ReplyMarkup {
    match step.input {
        InputKind::Text => keyboards::flow_controls(i18n, lang, step.prev.is_some()),
        InputKind::Location => keyboards::location_request(i18n, lang),
        InputKind::Photos => keyboards::photos_controls(i18n, lang),
    }
}

/// Leave the current flow: show a notice (dropping any reply keyboard) and
/// re-render the main menu as the new window. `notice` is pre-translated so
/// effects can surface backend messages through the same path.
pub async fn exit_flow(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    authenticated: bool,
    notice: &str,
) -> Result<()> {
    ctx.clear_flow();

    let notice = bot
        .send_message(chat_id, notice)
        .reply_markup(keyboards::remove_reply_keyboard())
        .await?;

    replace_window(
        bot,
        chat_id,
        &mut ctx.window,
        &i18n.t("menu.title", lang, None),
        Some(ReplyMarkup::InlineKeyboard(keyboards::main_menu(
            i18n,
            lang,
            authenticated,
        ))),
    )
    .await?;

    // The notice belongs to the new window so the next replacement cleans it
    ctx.window.content.push(notice.id.0);
    Ok(())
}

/// Replace the window with the main menu
pub async fn show_menu(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    authenticated: bool,
    title: &str,
) -> Result<()> {
    replace_window(
        bot,
        chat_id,
        &mut ctx.window,
        title,
        Some(ReplyMarkup::InlineKeyboard(keyboards::main_menu(
            i18n,
            lang,
            authenticated,
        ))),
    )
    .await
}

/// Handle a message arriving while the user is inside a flow
pub async fn handle_flow_message(
    bot: &Bot,
    msg: &Message,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    registry: &FlowRegistry,
) -> Result<()> {
    let lang = user.language_code.clone();
    let chat_id = msg.chat.id;

    let Some((flow, step_id)) = ctx.position().map(|(f, s)| (f.to_string(), s.to_string())) else {
        return Ok(());
    };
    let Some(step) = registry.step(&flow, &step_id) else {
        // Stale position, e.g. after a deploy changed the table
        warn!(user_id = ctx.user_id, flow, step = step_id, "Unknown flow position, resetting");
        let note = i18n.t("errors.unknown", &lang, None);
        return exit_flow(bot, chat_id, ctx, i18n, &lang, user.is_authenticated(), &note).await;
    };

    debug!(user_id = ctx.user_id, flow, step = step.id, "Flow input received");

    // Controls win over step input in every state
    if let Some(control) = msg.text().and_then(|text| classify_control(i18n, text)) {
        return match control {
            Control::Cancel => {
                info!(user_id = ctx.user_id, flow, step = step.id, "Flow cancelled");
                let note = i18n.t("flows.cancelled", &lang, None);
                exit_flow(bot, chat_id, ctx, i18n, &lang, user.is_authenticated(), &note).await
            }
            Control::Back => handle_back(bot, chat_id, ctx, i18n, &lang, registry, &flow, step).await,
            Control::Done => {
                handle_done(bot, msg, ctx, user, services, i18n, &lang, registry, &flow, step).await
            }
        };
    }

    match step.input {
        InputKind::Text => {
            handle_text_input(bot, msg, ctx, user, services, i18n, &lang, registry, &flow, step).await
        }
        InputKind::Location => {
            handle_location_input(bot, msg, ctx, user, services, i18n, &lang, registry, &flow, step)
                .await
        }
        InputKind::Photos => handle_photo_input(bot, msg, ctx, i18n, &lang, step).await,
    }
}

/// Back re-opens the previous step with its answer discarded. On the first
/// step it just re-renders the prompt.
async fn handle_back(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
    step: &FlowStep,
) -> Result<()> {
    match rewind(ctx, registry, flow, step) {
        Some(prev) => render_prompt(bot, chat_id, ctx, i18n, lang, prev, None).await,
        None => render_prompt(bot, chat_id, ctx, i18n, lang, step, None).await,
    }
}

/// Move the context one step back in the table. Both the current answer and
/// the previous one are dropped since the previous step is re-asked. Returns
/// the step to render, or `None` when the step has no back edge (the context
/// is then left untouched).
fn rewind<'r>(
    ctx: &mut ConversationContext,
    registry: &'r FlowRegistry,
    flow: &str,
    step: &FlowStep,
) -> Option<&'r FlowStep> {
    let prev = registry.step(flow, step.prev?)?;

    if let Some(field) = step.field {
        ctx.remove_data(field);
    }
    if let Some(field) = prev.field {
        ctx.remove_data(field);
    }
    ctx.set_step(prev.id);
    Some(prev)
}

/// Done finishes a photo-collection step, everywhere else it re-prompts
#[allow(clippy::too_many_arguments)]
async fn handle_done(
    bot: &Bot,
    msg: &Message,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
    step: &FlowStep,
) -> Result<()> {
    let chat_id = msg.chat.id;

    if step.input != InputKind::Photos {
        return render_prompt(bot, chat_id, ctx, i18n, lang, step, None).await;
    }

    let field = step.field.unwrap_or("images");
    if ctx.get_string_list(field).is_empty() {
        let note = i18n.t("flows.create_listing.need_image", lang, None);
        return render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
    }

    match step.effect {
        Some(effect) => {
            run_effect(effect, bot, chat_id, ctx, user, services, i18n, lang, registry, flow, step)
                .await
        }
        None => render_prompt(bot, chat_id, ctx, i18n, lang, step, None).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_text_input(
    bot: &Bot,
    msg: &Message,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
    step: &FlowStep,
) -> Result<()> {
    let chat_id = msg.chat.id;

    let Some(text) = msg.text() else {
        let note = i18n.t("errors.expected_text", lang, None);
        return render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
    };

    let value = match step.validator {
        Some(validator) => match validator.validate(text) {
            Ok(value) => value,
            Err(error_key) => {
                debug!(user_id = ctx.user_id, flow, step = step.id, "Input rejected by validator");
                let note = i18n.t(error_key, lang, None);
                return render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
            }
        },
        None => serde_json::Value::String(text.trim().to_string()),
    };

    if let Some(field) = step.field {
        ctx.set_data(field, value);
    }

    advance(bot, chat_id, ctx, user, services, i18n, lang, registry, flow, step).await
}

#[allow(clippy::too_many_arguments)]
async fn handle_location_input(
    bot: &Bot,
    msg: &Message,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
    step: &FlowStep,
) -> Result<()> {
    let chat_id = msg.chat.id;

    let Some(location) = msg.location() else {
        let note = i18n.t("errors.expected_location", lang, None);
        return render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
    };

    ctx.set_data("latitude", serde_json::Value::String(location.latitude.to_string()));
    ctx.set_data("longitude", serde_json::Value::String(location.longitude.to_string()));

    advance(bot, chat_id, ctx, user, services, i18n, lang, registry, flow, step).await
}

async fn handle_photo_input(
    bot: &Bot,
    msg: &Message,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    step: &FlowStep,
) -> Result<()> {
    let chat_id = msg.chat.id;

    let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) else {
        let note = i18n.t("errors.expected_photo", lang, None);
        return render_prompt(bot, chat_id, ctx, i18n, lang, step, Some(note)).await;
    };

    let field = step.field.unwrap_or("images");
    let count = ctx.push_string(field, largest.file.id.clone());
    debug!(user_id = ctx.user_id, count, "Listing photo collected");

    let mut params = TranslationParams::new();
    params.insert("count".to_string(), count.to_string());
    let text = i18n.t("flows.create_listing.image_added", lang, Some(&params));
    replace_window(
        bot,
        chat_id,
        &mut ctx.window,
        &text,
        Some(keyboards::photos_controls(i18n, lang)),
    )
    .await
}

/// Move past a completed step: fire its effect or step to the next prompt
#[allow(clippy::too_many_arguments)]
async fn advance(
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
    if let Some(effect) = step.effect {
        return run_effect(effect, bot, chat_id, ctx, user, services, i18n, lang, registry, flow, step)
            .await;
    }

    match step.next.and_then(|next_id| registry.step(flow, next_id)) {
        Some(next) => {
            ctx.set_step(next.id);
            render_prompt(bot, chat_id, ctx, i18n, lang, next, None).await
        }
        None => {
            // A step without next or effect is a table bug; bail out cleanly
            warn!(flow, step = step.id, "Dead-end step reached");
            let note = i18n.t("errors.unknown", lang, None);
            exit_flow(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note).await
        }
    }
}

/// Step to the given next step id and render it. Used by effects that
/// continue the flow after a successful backend call.
pub(super) async fn continue_to(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    registry: &FlowRegistry,
    flow: &str,
    next_id: &str,
) -> Result<()> {
    match registry.step(flow, next_id) {
        Some(next) => {
            ctx.set_step(next.id);
            render_prompt(bot, chat_id, ctx, i18n, lang, next, None).await
        }
        None => {
            warn!(flow, next = next_id, "Continue target missing from flow table");
            Ok(())
        }
    }
}

/// Translate a backend error into the line shown above a re-prompt.
/// Also used by the profile handler, which surfaces backend errors the same
/// way.
pub(crate) fn api_error_note(i18n: &I18n, lang: &str, error: &ApiError) -> String {
    match error {
        ApiError::SessionExpired => i18n.t("errors.session_expired", lang, None),
        ApiError::Unavailable(_) => i18n.t("errors.api_unavailable", lang, None),
        ApiError::Unauthorized(message) | ApiError::Rejected { message, .. } => {
            let mut params = TranslationParams::new();
            params.insert("message".to_string(), message.clone());
            i18n.t("errors.api_rejected", lang, Some(&params))
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_effect(
    effect: StepEffect,
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
    info!(user_id = ctx.user_id, flow, step = step.id, ?effect, "Running flow effect");
    match effect {
        StepEffect::SubmitLogin => {
            auth::submit_login(bot, chat_id, ctx, user, services, i18n, lang, step).await
        }
        StepEffect::RequestResetCode => {
            auth::request_reset_code(bot, chat_id, ctx, user, services, i18n, lang, registry, flow, step)
                .await
        }
        StepEffect::SubmitPasswordReset => {
            auth::submit_password_reset(bot, chat_id, ctx, user, services, i18n, lang, step).await
        }
        StepEffect::SubmitRegistration => {
            registration::submit_registration(
                bot, chat_id, ctx, user, services, i18n, lang, registry, flow, step,
            )
            .await
        }
        StepEffect::VerifyAndLogin => {
            registration::verify_and_login(bot, chat_id, ctx, user, services, i18n, lang, step).await
        }
        StepEffect::SubmitListing => {
            listing_create::submit_listing(bot, chat_id, ctx, user, services, i18n, lang, step).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::I18nConfig;
    use crate::state::flows::FLOW_REGISTRATION;
    use serde_json::json;

    fn test_i18n() -> I18n {
        let mut i18n = I18n::new(&I18nConfig {
            default_language: "en".to_string(),
            supported_languages: vec!["en".to_string(), "ru".to_string()],
        });
        i18n.insert_catalog(
            "en",
            json!({"buttons": {"back": "⬅️ Back", "cancel": "❌ Cancel", "done": "✅ Done"}}),
        );
        i18n.insert_catalog(
            "ru",
            json!({"buttons": {"back": "⬅️ Назад", "cancel": "❌ Отмена", "done": "✅ Готово"}}),
        );
        i18n
    }

    #[test]
    fn test_classify_control_matches_every_language() {
        let i18n = test_i18n();

        // A user who switched language mid-flow still gets out
        assert_eq!(classify_control(&i18n, "❌ Cancel"), Some(Control::Cancel));
        assert_eq!(classify_control(&i18n, "❌ Отмена"), Some(Control::Cancel));
        assert_eq!(classify_control(&i18n, "⬅️ Back"), Some(Control::Back));
        assert_eq!(classify_control(&i18n, "⬅️ Назад"), Some(Control::Back));
        assert_eq!(classify_control(&i18n, "✅ Done"), Some(Control::Done));
        assert_eq!(classify_control(&i18n, "✅ Готово"), Some(Control::Done));
    }

    #[test]
    fn test_classify_control_ignores_ordinary_input() {
        let i18n = test_i18n();

        assert_eq!(classify_control(&i18n, "user@example.com"), None);
        assert_eq!(classify_control(&i18n, "cancel"), None);
        assert_eq!(classify_control(&i18n, "⬅️ Back please"), None);
        assert_eq!(classify_control(&i18n, ""), None);
    }

    #[test]
    fn test_rewind_drops_current_and_previous_answers() {
        let registry = FlowRegistry::new();
        let mut ctx = ConversationContext::new(1);
        ctx.start_flow(FLOW_REGISTRATION, "email");
        ctx.set_data("first_name", json!("Jane"));
        ctx.set_data("last_name", json!("Doe"));
        ctx.set_data("email", json!("jane@example.com"));

        let step = registry.step(FLOW_REGISTRATION, "email").unwrap();
        let prev = rewind(&mut ctx, &registry, FLOW_REGISTRATION, step).unwrap();

        assert_eq!(prev.id, "last_name");
        assert_eq!(ctx.position(), Some((FLOW_REGISTRATION, "last_name")));
        // The re-asked step's old answer is gone along with the current one
        assert!(ctx.get_string("email").is_none());
        assert!(ctx.get_string("last_name").is_none());
        assert_eq!(ctx.get_string("first_name").as_deref(), Some("Jane"));
    }

    #[test]
    fn test_rewind_on_first_step_changes_nothing() {
        let registry = FlowRegistry::new();
        let mut ctx = ConversationContext::new(1);
        ctx.start_flow(FLOW_REGISTRATION, "first_name");
        ctx.set_data("first_name", json!("Jane"));

        let step = registry.step(FLOW_REGISTRATION, "first_name").unwrap();
        assert!(rewind(&mut ctx, &registry, FLOW_REGISTRATION, step).is_none());

        assert_eq!(ctx.position(), Some((FLOW_REGISTRATION, "first_name")));
        assert_eq!(ctx.get_string("first_name").as_deref(), Some("Jane"));
    }
}
