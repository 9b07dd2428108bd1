//! User service
//!
//! Bot-side user directory: ensures every Telegram user has a row and keeps
//! their interface language.

use tracing::info;

use crate::database::repositories::UserRepository;
use crate::models::{CreateUserRequest, User};
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct UserService {
    repository: UserRepository,
}

impl UserService {
    pub fn new(repository: UserRepository) -> Self {
        Self { repository }
    }

    /// Return the stored user, creating the row on first contact
    pub async fn ensure_user(
        &self,
        telegram_id: i64,
        username: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        language_code: String,
    ) -> Result<User> {
        if let Some(user) = self.repository.find_by_telegram_id(telegram_id).await? {
            return Ok(user);
        }

        let user = self
            .repository
            .create(CreateUserRequest {
                telegram_id,
                username,
                first_name,
                last_name,
                language_code: Some(language_code),
            })
            .await?;
        info!(telegram_id, "New user registered");
        Ok(user)
    }

    /// Reload a user's row, e.g. after tokens changed elsewhere
    pub async fn find(&self, telegram_id: i64) -> Result<Option<User>> {
        self.repository.find_by_telegram_id(telegram_id).await
    }

    /// Switch the user's interface language
    pub async fn set_language(&self, telegram_id: i64, language_code: &str) -> Result<()> {
        self.repository.update_language(telegram_id, language_code).await
    }
}
