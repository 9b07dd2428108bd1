//! Services module
//!
//! Business logic above the repositories and the API client

pub mod session;
pub mod user;

pub use session::{CredentialStore, SessionManager};
pub use user::UserService;

use sqlx::PgPool;

use crate::api::SwipeApiClient;
use crate::config::Settings;
use crate::database::repositories::UserRepository;
use crate::utils::errors::Result;

/// Service factory wiring repositories and the API client together
#[derive(Clone, Debug)]
pub struct ServiceFactory {
    pub user_service: UserService,
    pub session: SessionManager<UserRepository>,
}

impl ServiceFactory {
    pub fn new(pool: PgPool, settings: &Settings) -> Result<Self> {
        let api = SwipeApiClient::new(&settings.api)?;
        let repository = UserRepository::new(pool);

        Ok(Self {
            user_service: UserService::new(repository.clone()),
            session: SessionManager::new(api, repository),
        })
    }
}
