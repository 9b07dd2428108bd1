//! SwipeBot Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::Update;
use teloxide::utils::command::BotCommands as TeloxideBotCommands;
use tracing::{error, info, warn};

use swipebot::{
    config::Settings,
    database::connection::{create_pool, run_migrations, DatabaseConfig},
    handlers::{callbacks, commands, messages},
    i18n::I18n,
    services::ServiceFactory,
    state::{FlowRegistry, StateStorage},
    utils::logging,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard must outlive the dispatcher
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting SwipeBot...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: settings.database.min_connections,
        ..DatabaseConfig::default()
    };
    let db_pool = create_pool(&db_config).await?;
    run_migrations(&db_pool).await?;

    // Initialize state storage
    info!("Connecting to Redis...");
    let state_storage = StateStorage::new(settings.redis.clone()).await?;

    // Initialize i18n system
    info!("Loading translations...");
    let mut i18n = I18n::new(&settings.i18n);
    i18n.load_translations().await?;

    // Initialize bot and services
    let bot = Bot::new(&settings.bot.token);
    let services = ServiceFactory::new(db_pool, &settings)?;
    let registry = FlowRegistry::new();

    info!("Setting up bot handlers...");
    let handler = create_handler();

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![
            Arc::new(services),
            Arc::new(state_storage),
            Arc::new(i18n),
            Arc::new(registry)
        ])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("SwipeBot is ready, starting polling...");
    dispatcher.dispatch().await;

    info!("SwipeBot has been shut down.");
    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use teloxide::dispatching::UpdateFilterExt;

    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<BotCommand>()
                        .endpoint(handle_commands),
                )
                .branch(dptree::endpoint(handle_messages)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callbacks))
}

#[derive(TeloxideBotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "SwipeBot Commands")]
enum BotCommand {
    #[command(description = "Show the main menu")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Show your profile")]
    Profile,
    #[command(description = "Reset your password")]
    ResetPassword,
    #[command(description = "Log out of your account")]
    Logout,
}

/// Handle bot commands
async fn handle_commands(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    services: Arc<ServiceFactory>,
    state_storage: Arc<StateStorage>,
    i18n: Arc<I18n>,
    registry: Arc<FlowRegistry>,
) -> HandlerResult {
    let services = (*services).clone();
    let state_storage = (*state_storage).clone();
    let i18n = (*i18n).clone();
    let registry = (*registry).clone();

    let result = match cmd {
        BotCommand::Start => {
            commands::handle_start(bot, msg, services, state_storage, i18n).await
        }
        BotCommand::Help => commands::handle_help(bot, msg, services, i18n).await,
        BotCommand::Profile => {
            commands::handle_profile(bot, msg, services, state_storage, i18n).await
        }
        BotCommand::ResetPassword => {
            commands::handle_reset_password(bot, msg, services, state_storage, i18n, registry).await
        }
        BotCommand::Logout => {
            commands::handle_logout(bot, msg, services, state_storage, i18n).await
        }
    };

    if let Err(e) = result {
        error!(error = %e, recoverable = e.is_recoverable(), "Error handling command");
        return Err(e.into());
    }

    Ok(())
}

/// Handle regular messages
async fn handle_messages(
    bot: Bot,
    msg: Message,
    services: Arc<ServiceFactory>,
    state_storage: Arc<StateStorage>,
    i18n: Arc<I18n>,
    registry: Arc<FlowRegistry>,
) -> HandlerResult {
    let services = (*services).clone();
    let state_storage = (*state_storage).clone();
    let i18n = (*i18n).clone();
    let registry = (*registry).clone();

    if let Err(e) = messages::handle_message(bot, msg, services, state_storage, i18n, registry).await
    {
        error!(error = %e, recoverable = e.is_recoverable(), "Error handling message");
        return Err(e.into());
    }

    Ok(())
}

/// Handle callback queries
async fn handle_callbacks(
    bot: Bot,
    query: teloxide::types::CallbackQuery,
    services: Arc<ServiceFactory>,
    state_storage: Arc<StateStorage>,
    i18n: Arc<I18n>,
    registry: Arc<FlowRegistry>,
) -> HandlerResult {
    let services = (*services).clone();
    let state_storage = (*state_storage).clone();
    let i18n = (*i18n).clone();
    let registry = (*registry).clone();

    if let Err(e) =
        callbacks::handle_callback_query(bot, query, services, state_storage, i18n, registry).await
    {
        error!(error = %e, recoverable = e.is_recoverable(), "Error handling callback query");
        return Err(e.into());
    }

    Ok(())
}
