//! Telegram photo download helpers
//!
//! The Swipe API accepts listing images as base64-encoded strings, so photos
//! shared with the bot are downloaded from Telegram and re-encoded before
//! submission.

use base64::Engine;
use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::debug;
use crate::utils::errors::Result;

/// Download a photo from Telegram servers by file id and encode it as base64.
pub async fn encode_photo_to_base64(bot: &Bot, file_id: &str) -> Result<String> {
    let file = bot.get_file(file_id.to_owned()).await?;

    let mut buffer: Vec<u8> = Vec::new();
    bot.download_file(&file.path, &mut buffer).await?;

    debug!(file_id = file_id, size = buffer.len(), "Photo downloaded from Telegram");

    Ok(base64::engine::general_purpose::STANDARD.encode(&buffer))
}
