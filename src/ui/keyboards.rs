//! Keyboard builders
//!
//! All inline and reply keyboards in one place. Callback data uses the
//! `prefix:action` convention routed in the callback handler.

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};

use crate::i18n::I18n;

/// Main menu, shaped by whether the user holds a session
pub fn main_menu(i18n: &I18n, lang: &str, authenticated: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    if authenticated {
        rows.push(vec![
            InlineKeyboardButton::callback(i18n.t("menu.buttons.listings", lang, None), "menu:listings"),
            InlineKeyboardButton::callback(i18n.t("menu.buttons.my_listings", lang, None), "menu:my_listings"),
        ]);
        rows.push(vec![InlineKeyboardButton::callback(
            i18n.t("menu.buttons.create_listing", lang, None),
            "menu:create",
        )]);
        rows.push(vec![
            InlineKeyboardButton::callback(i18n.t("menu.buttons.profile", lang, None), "menu:profile"),
            InlineKeyboardButton::callback(i18n.t("menu.buttons.language", lang, None), "menu:language"),
        ]);
        rows.push(vec![InlineKeyboardButton::callback(
            i18n.t("menu.buttons.logout", lang, None),
            "menu:logout",
        )]);
    } else {
        rows.push(vec![
            InlineKeyboardButton::callback(i18n.t("menu.buttons.login", lang, None), "menu:login"),
            InlineKeyboardButton::callback(i18n.t("menu.buttons.register", lang, None), "menu:register"),
        ]);
        rows.push(vec![InlineKeyboardButton::callback(
            i18n.t("menu.buttons.reset_password", lang, None),
            "menu:reset",
        )]);
        rows.push(vec![
            InlineKeyboardButton::callback(i18n.t("menu.buttons.listings", lang, None), "menu:listings"),
            InlineKeyboardButton::callback(i18n.t("menu.buttons.language", lang, None), "menu:language"),
        ]);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Language picker
pub fn language_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("English 🇬🇧", "lang:en"),
        InlineKeyboardButton::callback("Русский 🇷🇺", "lang:ru"),
    ]])
}

/// Back/Cancel controls shown under flow prompts. Reply buttons, so the
/// keyboard follows the user through every step without an extra edit.
pub fn flow_controls(i18n: &I18n, lang: &str, with_back: bool) -> ReplyMarkup {
    let mut row = Vec::new();
    if with_back {
        row.push(KeyboardButton::new(i18n.t("buttons.back", lang, None)));
    }
    row.push(KeyboardButton::new(i18n.t("buttons.cancel", lang, None)));
    let mut markup = KeyboardMarkup::new(vec![row]);
    markup.resize_keyboard = true;
    ReplyMarkup::Keyboard(markup)
}

/// Navigation under the listings page. `geo_items` holds (listing id, label)
/// pairs for listings on the page that carry coordinates.
pub fn listings_nav(
    i18n: &I18n,
    lang: &str,
    has_prev: bool,
    has_next: bool,
    geo_items: &[(i64, String)],
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    let mut pager = Vec::new();
    if has_prev {
        pager.push(InlineKeyboardButton::callback(i18n.t("buttons.prev", lang, None), "lst:prev"));
    }
    if has_next {
        pager.push(InlineKeyboardButton::callback(i18n.t("buttons.next", lang, None), "lst:next"));
    }
    if !pager.is_empty() {
        rows.push(pager);
    }
    for (id, label) in geo_items {
        rows.push(vec![InlineKeyboardButton::callback(
            format!("{} {}", i18n.t("buttons.geo", lang, None), label),
            format!("lst:geo:{id}"),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        i18n.t("buttons.exit", lang, None),
        "lst:exit",
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Reply keyboard for the location step: a location-request button plus
/// Back/Cancel as plain text rows.
pub fn location_request(i18n: &I18n, lang: &str) -> ReplyMarkup {
    let rows = vec![
        vec![KeyboardButton::new(i18n.t("flows.create_listing.location_button", lang, None))
            .request(ButtonRequest::Location)],
        vec![
            KeyboardButton::new(i18n.t("buttons.back", lang, None)),
            KeyboardButton::new(i18n.t("buttons.cancel", lang, None)),
        ],
    ];
    let mut markup = KeyboardMarkup::new(rows);
    markup.resize_keyboard = true;
    ReplyMarkup::Keyboard(markup)
}

/// Reply keyboard for the photo-collection step
pub fn photos_controls(i18n: &I18n, lang: &str) -> ReplyMarkup {
    let rows = vec![
        vec![KeyboardButton::new(i18n.t("buttons.done", lang, None))],
        vec![
            KeyboardButton::new(i18n.t("buttons.back", lang, None)),
            KeyboardButton::new(i18n.t("buttons.cancel", lang, None)),
        ],
    ];
    let mut markup = KeyboardMarkup::new(rows);
    markup.resize_keyboard = true;
    ReplyMarkup::Keyboard(markup)
}

/// Remove any active reply keyboard
pub fn remove_reply_keyboard() -> ReplyMarkup {
    ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
}
