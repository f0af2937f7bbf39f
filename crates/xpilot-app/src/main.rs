//! Xpilot application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the SQLite-backed chat store
//! 3. Build the Gemini client and the session manager
//! 4. Run the interactive terminal loop

mod cli;
mod repl;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use xpilot_chat::{CommandClipboard, GeminiClient, MemoryContext, SessionManager};
use xpilot_core::config::XpilotConfig;
use xpilot_storage::{ChatRepository, Database, SqliteStore};

use crate::cli::{expand_home, CliArgs};
use crate::repl::Repl;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = XpilotConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(model) = args.model.clone() {
        config.llm.model = model;
    }
    config.llm.api_key = args.resolve_api_key(config.llm.api_key.as_deref());

    // Tracing. Logs go to stderr so they never interleave with the chat.
    let filter = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    tracing::info!("Starting Xpilot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("xpilot.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let repository = ChatRepository::new(Arc::new(SqliteStore::new(db)));

    // Model client.
    let llm = match GeminiClient::new(&config.llm, config.persona.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!(
                "{}. Set XPILOT_API_KEY, pass --api-key, or add llm.api_key to {}.",
                e,
                config_file.display()
            );
            return Err(e.into());
        }
    };

    // Chat engine.
    let manager = Arc::new(SessionManager::load(
        &config,
        repository.clone(),
        MemoryContext::load(repository),
        llm,
        Arc::new(CommandClipboard::system()),
    )?);
    if args.temporary {
        manager.create_session(true)?;
    }

    let typing_speed = (config.ui.typing_effect && !args.no_typing)
        .then(|| Duration::from_millis(config.ui.typing_speed_ms));
    let mut repl = Repl::new(
        Arc::clone(&manager),
        config.persona.assistant_name.clone(),
        typing_speed,
    );
    repl.run().await?;

    tracing::info!("Xpilot exiting");
    Ok(())
}
