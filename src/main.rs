use ai_chat_client::cli::{Cli, Command, ConfigCommand, SettingsCommand, commands};
use ai_chat_client::settings::SettingsStore;
use ai_chat_client::{ChatClient, ClientConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    config.validate()?;

    let settings_path = cli
        .settings
        .or_else(SettingsStore::default_path)
        .unwrap_or_else(|| PathBuf::from("ai-chat-settings.toml"));
    let mut store = SettingsStore::load(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;

    tracing::debug!("Backend: {}", config.base_url);
    let client = ChatClient::new(config)?;

    match cli.command {
        Command::Chat { no_stream } => commands::chat(&client, &store, !no_stream).await?,
        Command::Ask { message, no_stream } => {
            if !commands::ask(&client, &store, &message, !no_stream).await? {
                std::process::exit(1);
            }
        }
        Command::TestConnection => commands::test_connection(&client, &store).await?,
        Command::Health => commands::health(&client).await?,
        Command::Info => commands::info(&client).await?,
        Command::Config(ConfigCommand::Get { provider }) => {
            commands::config_get(&client, &provider).await?
        }
        Command::Config(ConfigCommand::Save) => commands::config_save(&client, &store).await?,
        Command::Settings(SettingsCommand::Show) => commands::settings_show(&store)?,
        Command::Settings(SettingsCommand::Set(update)) => {
            commands::settings_set(&mut store, update)?
        }
    }

    Ok(())
}
