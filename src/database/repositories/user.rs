//! User repository implementation
//!
//! Persists bot users and their Swipe API credential pair. Token updates are
//! single-statement writes so a refresh never interleaves with a concurrent
//! read of a half-written pair.

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{CreateUserRequest, User};
use crate::utils::errors::SwipeBotError;

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, SwipeBotError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, language_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, telegram_id, username, first_name, last_name, language_code,
                      api_access_token, api_refresh_token, api_user_id, created_at, updated_at
            "#
        )
        .bind(request.telegram_id)
        .bind(request.username)
        .bind(request.first_name)
        .bind(request.last_name)
        .bind(request.language_code.unwrap_or_else(|| "en".to_string()))
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by Telegram ID
    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, SwipeBotError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, telegram_id, username, first_name, last_name, language_code,
                   api_access_token, api_refresh_token, api_user_id, created_at, updated_at
            FROM users WHERE telegram_id = $1
            "#
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Overwrite the stored credential pair for a user
    pub async fn update_tokens(
        &self,
        telegram_id: i64,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), SwipeBotError> {
        sqlx::query(
            r#"
            UPDATE users
            SET api_access_token = $2, api_refresh_token = $3, updated_at = $4
            WHERE telegram_id = $1
            "#
        )
        .bind(telegram_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drop the stored credential pair (logout / dead refresh token)
    pub async fn clear_tokens(&self, telegram_id: i64) -> Result<(), SwipeBotError> {
        sqlx::query(
            r#"
            UPDATE users
            SET api_access_token = NULL, api_refresh_token = NULL, updated_at = $2
            WHERE telegram_id = $1
            "#
        )
        .bind(telegram_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update the user's preferred interface language
    pub async fn update_language(&self, telegram_id: i64, language_code: &str) -> Result<(), SwipeBotError> {
        sqlx::query(
            "UPDATE users SET language_code = $2, updated_at = $3 WHERE telegram_id = $1"
        )
        .bind(telegram_id)
        .bind(language_code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
