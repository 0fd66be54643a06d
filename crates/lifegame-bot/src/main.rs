//! Lifegame chat bot entry point.
//!
//! Reads configuration from the environment, opens the player store,
//! loads prompt templates, connects the completion backend, starts the
//! action queue worker and serves the chat API until `Ctrl-C`.

mod config;

use std::sync::Arc;

use lifegame_chat::{AppState, ChatBot, start_server};
use lifegame_runner::{PromptEngine, create_backend};
use lifegame_store::PlayerStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::BotConfig;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage, templates, the backend
/// client, or the HTTP listener cannot be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("lifegame-bot starting");

    let config = BotConfig::from_env()?;
    info!(
        players_dir = %config.players_dir.display(),
        templates_dir = %config.templates_dir.display(),
        host = %config.server.host,
        port = config.server.port,
        "configuration loaded"
    );

    let store = Arc::new(PlayerStore::open(config.players_dir.clone()).await?);
    let prompts = Arc::new(PromptEngine::load(&config.templates_dir)?);

    let backend = Arc::new(create_backend(&config.backend)?);
    info!(
        backend = backend.name(),
        model = backend.model(),
        timeout_secs = config.backend.timeout.as_secs(),
        "completion backend configured"
    );

    let (bot, worker) = ChatBot::start(backend, prompts, store);
    let state = Arc::new(AppState::new(Arc::new(bot)));

    start_server(&config.server, state).await?;

    worker.abort();
    info!("lifegame-bot stopped");
    Ok(())
}
