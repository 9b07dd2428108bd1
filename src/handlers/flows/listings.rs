//! Paginated listings browser
//!
//! Renders two listing cards per page with a navigation control underneath.
//! Each page fetch asks for one item beyond the page so "next" is only
//! offered when a further page actually exists. Geo buttons open a location
//! message as the window's aux slot without disturbing the cards.

use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, InputMedia, InputMediaPhoto, ReplyMarkup};
use tracing::{debug, info, warn};

use crate::i18n::{I18n, TranslationParams};
use crate::models::{Announcement, BrowseMode, User};
use crate::services::ServiceFactory;
use crate::state::{ConversationContext, PageCursor};
use crate::ui::{keyboards, retire_messages};
use crate::utils::errors::{Result, SwipeBotError};

use super::engine;

/// Listings shown per page
pub const PAGE_SIZE: i64 = 2;

/// Telegram caps media groups at ten items
const MAX_CARD_MEDIA: usize = 10;

/// What a fetched page allows the user to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub shown: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Derive the page shape from the cursor offset and the lookahead fetch.
/// `fetched` is the size of a `PAGE_SIZE + 1` request result.
pub fn page_plan(offset: i64, fetched: usize) -> PagePlan {
    PagePlan {
        shown: fetched.min(PAGE_SIZE as usize),
        has_prev: offset > 0,
        has_next: fetched > PAGE_SIZE as usize,
    }
}

/// What to do with a fetched batch before any state is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOutcome {
    /// Commit the target cursor and render the page
    Render,
    /// Ran past the end: notify, keep the current page and cursor
    Bounce,
    /// Nothing to browse at all
    Empty,
}

fn classify_fetch(offset: i64, fetched: usize) -> FetchOutcome {
    if fetched > 0 {
        FetchOutcome::Render
    } else if offset > 0 {
        FetchOutcome::Bounce
    } else {
        FetchOutcome::Empty
    }
}

/// Enter the browsing view for the given mode
pub async fn open(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    mode: BrowseMode,
) -> Result<()> {
    if mode == BrowseMode::Mine && !user.is_authenticated() {
        let note = i18n.t("errors.not_logged_in", lang, None);
        return engine::show_menu(bot, chat_id, ctx, i18n, lang, false, &note).await;
    }

    info!(user_id = ctx.user_id, ?mode, "Browsing opened");
    goto_page(bot, chat_id, ctx, user, services, i18n, lang, PageCursor::new(mode)).await
}

/// Move one page forward
pub async fn next_page(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
) -> Result<()> {
    let Some(cursor) = ctx.cursor else {
        return exit(bot, chat_id, ctx, user, i18n, lang).await;
    };
    let target = PageCursor {
        offset: cursor.offset + PAGE_SIZE,
        ..cursor
    };
    goto_page(bot, chat_id, ctx, user, services, i18n, lang, target).await
}

/// Move one page back
pub async fn prev_page(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
) -> Result<()> {
    let Some(cursor) = ctx.cursor else {
        return exit(bot, chat_id, ctx, user, i18n, lang).await;
    };
    let target = PageCursor {
        offset: (cursor.offset - PAGE_SIZE).max(0),
        ..cursor
    };
    goto_page(bot, chat_id, ctx, user, services, i18n, lang, target).await
}

/// Show the location of a listing on the current page as the aux message
pub async fn show_geo(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    i18n: &I18n,
    lang: &str,
    listing_id: i64,
) -> Result<()> {
    let coords = ctx
        .get_data("geo")
        .and_then(|v| v.get(listing_id.to_string()))
        .and_then(|v| {
            let lat = v.get(0)?.as_f64()?;
            let lon = v.get(1)?.as_f64()?;
            Some((lat, lon))
        });

    // Only the aux slot is replaced; cards and control stay in place
    let retired = ctx.window.take_aux();
    retire_messages(bot, chat_id, retired).await;

    match coords {
        Some((latitude, longitude)) => {
            let sent = bot.send_location(chat_id, latitude, longitude).await?;
            ctx.window.aux = Some(sent.id.0);
        }
        None => {
            debug!(user_id = ctx.user_id, listing_id, "Geo requested for listing without coordinates");
            let sent = bot
                .send_message(chat_id, i18n.t("listings.no_geo", lang, None))
                .await?;
            ctx.window.aux = Some(sent.id.0);
        }
    }
    Ok(())
}

/// Leave the browsing view and return to the menu
pub async fn exit(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &User,
    i18n: &I18n,
    lang: &str,
) -> Result<()> {
    ctx.clear_flow();
    let title = i18n.t("menu.title", lang, None);
    engine::show_menu(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &title).await
}

async fn fetch_page(
    user: &mut User,
    services: &ServiceFactory,
    mode: BrowseMode,
    offset: i64,
) -> Result<Vec<Announcement>> {
    let limit = PAGE_SIZE + 1;
    if user.is_authenticated() {
        services
            .session
            .invoke(user, |api, token| async move {
                api.list_announcements(token.as_deref(), mode, limit, offset).await
            })
            .await
    } else {
        services
            .session
            .api()
            .list_announcements(None, mode, limit, offset)
            .await
            .map_err(SwipeBotError::Api)
    }
}

/// Fetch the target page and, only if the fetch succeeds, commit it: cursor,
/// geo map and window all change together or not at all. A failed fetch and
/// a past-the-end fetch leave the current page fully usable and just add a
/// notice below it.
#[allow(clippy::too_many_arguments)]
async fn goto_page(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    user: &mut User,
    services: &ServiceFactory,
    i18n: &I18n,
    lang: &str,
    target: PageCursor,
) -> Result<()> {
    let items = match fetch_page(user, services, target.mode, target.offset).await {
        Ok(items) => items,
        Err(SwipeBotError::Api(error)) => {
            info!(user_id = ctx.user_id, error = %error, "Listings fetch failed");
            let note = engine::api_error_note(i18n, lang, &error);
            return send_notice(bot, chat_id, ctx, &note).await;
        }
        Err(e) => return Err(e),
    };

    match classify_fetch(target.offset, items.len()) {
        FetchOutcome::Bounce => {
            // Stale next press, or items deleted under the cursor
            return send_notice(bot, chat_id, ctx, &i18n.t("listings.no_more", lang, None)).await;
        }
        FetchOutcome::Empty => {
            let empty_key = match target.mode {
                BrowseMode::All => "listings.empty_all",
                BrowseMode::Mine => "listings.empty_mine",
            };
            ctx.clear_flow();
            let note = i18n.t(empty_key, lang, None);
            return engine::show_menu(bot, chat_id, ctx, i18n, lang, user.is_authenticated(), &note)
                .await;
        }
        FetchOutcome::Render => {}
    }

    let plan = page_plan(target.offset, items.len());
    let page_items = &items[..plan.shown];

    // Old page goes away before the new one appears
    let retired = ctx.window.take_all();
    retire_messages(bot, chat_id, retired).await;

    ctx.clear_flow();
    ctx.cursor = Some(target);

    // Geo lookup data for the nav buttons
    let mut geo_map = serde_json::Map::new();
    let mut geo_items = Vec::new();
    for item in page_items {
        if let Some((lat, lon)) = item.coordinates() {
            geo_map.insert(item.id.to_string(), serde_json::json!([lat, lon]));
            geo_items.push((item.id, short_label(&item.address)));
        }
    }
    ctx.set_data("geo", serde_json::Value::Object(geo_map));

    let mut content = Vec::with_capacity(page_items.len());
    for item in page_items {
        content.extend(send_card(bot, chat_id, i18n, lang, item).await?);
    }

    let mut params = TranslationParams::new();
    params.insert("page".to_string(), (target.offset / PAGE_SIZE + 1).to_string());
    let control_text = i18n.t("listings.page", lang, Some(&params));

    let keyboard = keyboards::listings_nav(i18n, lang, plan.has_prev, plan.has_next, &geo_items);
    let control = bot
        .send_message(chat_id, control_text)
        .reply_markup(ReplyMarkup::InlineKeyboard(keyboard))
        .await?;

    ctx.window.content = content;
    ctx.window.control = Some(control.id.0);
    Ok(())
}

/// A line shown below the current page; tracked in the window so the next
/// replacement cleans it up.
async fn send_notice(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &mut ConversationContext,
    text: &str,
) -> Result<()> {
    let sent = bot.send_message(chat_id, text).await?;
    ctx.window.content.push(sent.id.0);
    Ok(())
}

/// Render a listing card: a media group when it has several images, a single
/// photo with caption for one, a text message for none. Returns the sent
/// message ids.
async fn send_card(
    bot: &Bot,
    chat_id: ChatId,
    i18n: &I18n,
    lang: &str,
    item: &Announcement,
) -> Result<Vec<i32>> {
    let text = card_text(i18n, lang, item);

    let mut urls = Vec::new();
    for image in item.images.iter().take(MAX_CARD_MEDIA) {
        match reqwest::Url::parse(&image.image_url) {
            Ok(url) => urls.push(url),
            Err(e) => {
                warn!(listing_id = item.id, error = %e, "Listing image URL unparseable, skipping");
            }
        }
    }

    match urls.len() {
        0 => Ok(vec![bot.send_message(chat_id, text).await?.id.0]),
        1 => {
            let sent = bot
                .send_photo(chat_id, InputFile::url(urls.remove(0)))
                .caption(text)
                .await?;
            Ok(vec![sent.id.0])
        }
        _ => {
            let media: Vec<InputMedia> = urls
                .into_iter()
                .enumerate()
                .map(|(i, url)| {
                    let photo = InputMediaPhoto::new(InputFile::url(url));
                    // The group caption lives on the first item
                    let photo = if i == 0 { photo.caption(text.clone()) } else { photo };
                    InputMedia::Photo(photo)
                })
                .collect();
            let sent = bot.send_media_group(chat_id, media).await?;
            Ok(sent.into_iter().map(|m| m.id.0).collect())
        }
    }
}

fn card_text(i18n: &I18n, lang: &str, item: &Announcement) -> String {
    let apartment = match &item.apartment_number {
        Some(number) => {
            let mut params = TranslationParams::new();
            params.insert("number".to_string(), number.clone());
            i18n.t("listings.apartment_suffix", lang, Some(&params))
        }
        None => String::new(),
    };

    let contact = item
        .owner
        .as_ref()
        .and_then(|owner| owner.phone.clone())
        .unwrap_or_else(|| i18n.t("listings.no_contact", lang, None));

    let mut params = TranslationParams::new();
    params.insert("address".to_string(), item.address.clone());
    params.insert("apartment".to_string(), apartment);
    params.insert("price".to_string(), format!("{:.0}", item.price));
    params.insert("area".to_string(), format!("{}", item.area));
    params.insert("contact".to_string(), contact);
    params.insert(
        "description".to_string(),
        item.description.clone().unwrap_or_default(),
    );
    i18n.t("listings.card", lang, Some(&params)).trim_end().to_string()
}

fn short_label(address: &str) -> String {
    const MAX: usize = 24;
    if address.chars().count() <= MAX {
        address.to_string()
    } else {
        let truncated: String = address.chars().take(MAX).collect();
        format!("{truncated}…")
    }
}

/// Parse the numeric argument of a `lst:geo:<id>` callback
pub fn parse_geo_target(parts: &[&str]) -> Option<i64> {
    parts.get(2)?.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::I18nConfig;
    use crate::models::{AnnouncementImage, AnnouncementOwner};

    fn test_i18n() -> I18n {
        let mut i18n = I18n::new(&I18nConfig {
            default_language: "en".to_string(),
            supported_languages: vec!["en".to_string()],
        });
        i18n.insert_catalog(
            "en",
            serde_json::json!({
                "listings": {
                    "card": "🏠 {address}{apartment}\n💰 {price}\n📐 {area} m²\n📞 {contact}\n\n{description}",
                    "apartment_suffix": ", apt. {number}",
                    "no_contact": "No contact info"
                }
            }),
        );
        i18n
    }

    fn test_listing() -> Announcement {
        Announcement {
            id: 7,
            address: "Baker St, 221B".to_string(),
            apartment_number: Some("12".to_string()),
            price: 120000.0,
            area: 54.5,
            description: Some("Bright and quiet.".to_string()),
            latitude: None,
            longitude: None,
            images: Vec::<AnnouncementImage>::new(),
            owner: Some(AnnouncementOwner {
                first_name: Some("John".to_string()),
                last_name: None,
                phone: Some("+380501234567".to_string()),
            }),
        }
    }

    #[test]
    fn test_page_plan_boundaries() {
        // First page of a long list: lookahead hit, no prev
        assert_eq!(
            page_plan(0, 3),
            PagePlan { shown: 2, has_prev: false, has_next: true }
        );
        // Exact final page
        assert_eq!(
            page_plan(2, 2),
            PagePlan { shown: 2, has_prev: true, has_next: false }
        );
        // Final page with a single item
        assert_eq!(
            page_plan(4, 1),
            PagePlan { shown: 1, has_prev: true, has_next: false }
        );
        // Single page overall
        assert_eq!(
            page_plan(0, 2),
            PagePlan { shown: 2, has_prev: false, has_next: false }
        );
    }

    #[test]
    fn test_classify_fetch_commits_only_on_results() {
        assert_eq!(classify_fetch(2, 3), FetchOutcome::Render);
        assert_eq!(classify_fetch(0, 1), FetchOutcome::Render);
        // Past the end: the page in the chat stays as it is
        assert_eq!(classify_fetch(4, 0), FetchOutcome::Bounce);
        assert_eq!(classify_fetch(0, 0), FetchOutcome::Empty);
    }

    #[test]
    fn test_card_shows_owner_contact() {
        let i18n = test_i18n();
        let card = card_text(&i18n, "en", &test_listing());

        assert!(card.contains("🏠 Baker St, 221B, apt. 12"));
        assert!(card.contains("📞 +380501234567"));
        assert!(card.contains("Bright and quiet."));
    }

    #[test]
    fn test_card_falls_back_without_contact() {
        let i18n = test_i18n();

        let mut item = test_listing();
        item.owner = None;
        assert!(card_text(&i18n, "en", &item).contains("📞 No contact info"));

        // An owner record without a phone is the same as no owner
        item.owner = Some(AnnouncementOwner {
            first_name: Some("John".to_string()),
            last_name: None,
            phone: None,
        });
        assert!(card_text(&i18n, "en", &item).contains("📞 No contact info"));
    }

    #[test]
    fn test_short_label_truncates() {
        assert_eq!(short_label("Main St 5"), "Main St 5");
        let long = "A very long street name somewhere far away";
        let label = short_label(long);
        assert!(label.chars().count() <= 25);
        assert!(label.ends_with('…'));
    }

    #[test]
    fn test_parse_geo_target() {
        assert_eq!(parse_geo_target(&["lst", "geo", "42"]), Some(42));
        assert_eq!(parse_geo_target(&["lst", "geo", "x"]), None);
        assert_eq!(parse_geo_target(&["lst", "geo"]), None);
    }
}
