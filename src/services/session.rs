//! Session manager
//!
//! The single component allowed to mutate a user's stored Swipe API
//! credential pair. Every authenticated backend call goes through
//! [`SessionManager::invoke`], which transparently refreshes the access token
//! and retries the original call exactly once on a confirmed 401. A second
//! 401 after refresh, or a failed refresh, surfaces as
//! [`ApiError::SessionExpired`]; nothing at this layer retries transport
//! failures.

use std::future::Future;
use tracing::{debug, info, warn};

use crate::api::SwipeApiClient;
use crate::database::repositories::UserRepository;
use crate::models::{TokenPair, User};
use crate::utils::errors::{ApiError, ApiResult, Result};

/// Persistence seam for the credential pair, injected so the
/// refresh-and-retry path can be tested without a database.
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    /// Atomically overwrite both tokens for the user
    async fn save_tokens(&self, telegram_id: i64, tokens: &TokenPair) -> Result<()>;

    /// Drop both tokens for the user
    async fn clear_tokens(&self, telegram_id: i64) -> Result<()>;
}

impl CredentialStore for UserRepository {
    async fn save_tokens(&self, telegram_id: i64, tokens: &TokenPair) -> Result<()> {
        self.update_tokens(telegram_id, &tokens.access_token, &tokens.refresh_token)
            .await
    }

    async fn clear_tokens(&self, telegram_id: i64) -> Result<()> {
        UserRepository::clear_tokens(self, telegram_id).await
    }
}

/// Session manager owning the refresh-and-retry-once policy
#[derive(Clone, Debug)]
pub struct SessionManager<S: CredentialStore> {
    api: SwipeApiClient,
    store: S,
}

impl<S: CredentialStore> SessionManager<S> {
    pub fn new(api: SwipeApiClient, store: S) -> Self {
        Self { api, store }
    }

    /// Access to the raw client for unauthenticated operations
    /// (login, register, verify, forgot/reset password).
    pub fn api(&self) -> &SwipeApiClient {
        &self.api
    }

    /// Execute a backend operation on behalf of a user.
    ///
    /// The operation receives a client handle and the current access token
    /// and may be called a second time after a successful refresh. The
    /// in-memory `user` is kept in sync with the stored credential pair.
    pub async fn invoke<T, F, Fut>(&self, user: &mut User, operation: F) -> Result<T>
    where
        F: Fn(SwipeApiClient, Option<String>) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let error = match operation(self.api.clone(), user.api_access_token.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !matches!(error, ApiError::Unauthorized(_)) {
            return Err(error.into());
        }

        let Some(refresh_token) = user.api_refresh_token.clone() else {
            debug!(user_id = user.telegram_id, "401 with no refresh token, no retry path");
            return Err(ApiError::SessionExpired.into());
        };

        debug!(user_id = user.telegram_id, "Access token rejected, attempting refresh");

        let tokens = match self.api.refresh_tokens(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(refresh_error) => {
                // A dead refresh token is unrecoverable; drop the pair so the
                // user gets a clean re-login instead of a refresh attempt on
                // every subsequent call.
                warn!(user_id = user.telegram_id, error = %refresh_error, "Token refresh failed");
                self.store.clear_tokens(user.telegram_id).await?;
                user.api_access_token = None;
                user.api_refresh_token = None;
                return Err(ApiError::SessionExpired.into());
            }
        };

        self.store.save_tokens(user.telegram_id, &tokens).await?;
        user.api_access_token = Some(tokens.access_token.clone());
        user.api_refresh_token = Some(tokens.refresh_token.clone());
        info!(user_id = user.telegram_id, "Credential pair refreshed");

        match operation(self.api.clone(), user.api_access_token.clone()).await {
            Ok(value) => Ok(value),
            // Retried exactly once; a second 401 means the session is gone.
            Err(ApiError::Unauthorized(_)) => Err(ApiError::SessionExpired.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a freshly issued credential pair after login or verification
    pub async fn store_login(&self, user: &mut User, tokens: TokenPair) -> Result<()> {
        self.store.save_tokens(user.telegram_id, &tokens).await?;
        user.api_access_token = Some(tokens.access_token);
        user.api_refresh_token = Some(tokens.refresh_token);
        info!(user_id = user.telegram_id, "User logged in");
        Ok(())
    }

    /// Explicit logout: invalidate the stored credential pair
    pub async fn logout(&self, user: &mut User) -> Result<()> {
        self.store.clear_tokens(user.telegram_id).await?;
        user.api_access_token = None;
        user.api_refresh_token = None;
        info!(user_id = user.telegram_id, "User logged out");
        Ok(())
    }
}
