//! State storage implementation
//!
//! Persists conversation state in Redis with JSON serialization, a key
//! prefix and per-context TTL. A context that expired while sitting in
//! Redis is dropped on load.

use redis::AsyncCommands;
use tracing::{debug, error, warn};
use crate::utils::errors::Result;
use crate::config::RedisConfig;
use super::context::ConversationContext;

/// Redis-based state storage manager
#[derive(Clone)]
pub struct StateStorage {
    /// Redis connection manager
    connection_manager: redis::aio::ConnectionManager,
    /// Redis configuration
    config: RedisConfig,
}

impl StateStorage {
    /// Create a new state storage instance
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// Save conversation context to Redis
    pub async fn save_context(&self, context: &ConversationContext) -> Result<()> {
        let key = self.context_key(context.user_id);
        debug!(user_id = context.user_id, flow = ?context.flow, step = ?context.step,
               "Saving context to Redis");

        let serialized = serde_json::to_string(context)?;
        let mut conn = self.connection_manager.clone();

        // TTL follows the flow expiry where one is set, minimum 60 seconds
        let ttl_seconds = if let Some(expires_at) = context.expires_at {
            let duration = expires_at - chrono::Utc::now();
            std::cmp::max(duration.num_seconds(), 60) as u64
        } else {
            self.config.ttl_seconds
        };

        match conn.set_ex::<_, _, ()>(&key, serialized, ttl_seconds).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(user_id = context.user_id, error = %e, "Failed to save context to Redis");
                Err(e.into())
            }
        }
    }

    /// Load conversation context from Redis
    pub async fn load_context(&self, user_id: i64) -> Result<Option<ConversationContext>> {
        let key = self.context_key(user_id);
        let mut conn = self.connection_manager.clone();

        let serialized: Option<String> = conn.get(&key).await?;

        match serialized {
            Some(data) => {
                let context: ConversationContext = serde_json::from_str(&data)?;

                if context.is_expired() {
                    warn!(user_id, expires_at = ?context.expires_at, "Context has expired, removing");
                    self.delete_context(user_id).await?;
                    return Ok(None);
                }

                debug!(user_id, flow = ?context.flow, step = ?context.step, "Context loaded");
                Ok(Some(context))
            }
            None => Ok(None),
        }
    }

    /// Load a user's context or create a fresh one
    pub async fn load_or_create(&self, user_id: i64) -> Result<ConversationContext> {
        Ok(self
            .load_context(user_id)
            .await?
            .unwrap_or_else(|| ConversationContext::new(user_id)))
    }

    /// Delete conversation context from Redis
    pub async fn delete_context(&self, user_id: i64) -> Result<()> {
        let key = self.context_key(user_id);
        let mut conn = self.connection_manager.clone();
        conn.del::<_, ()>(&key).await?;
        debug!(user_id, "Context deleted from Redis");
        Ok(())
    }

    fn context_key(&self, user_id: i64) -> String {
        format!("{}:context:{}", self.config.prefix, user_id)
    }
}
