pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Terminal client for the AI Chat backend
#[derive(Parser)]
#[command(name = "ai-chat")]
#[command(about = "Chat with the AI Chat backend from the terminal")]
#[command(version)]
pub struct Cli {
    /// Client config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Backend base URL, overrides config and environment
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive chat. Ctrl-C stops the reply in progress, /exit quits.
    Chat {
        /// Wait for whole replies instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
    /// Send one message and print the reply
    Ask {
        message: String,
        /// Wait for the whole reply instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
    /// Check the configured provider through the backend
    TestConnection,
    /// Backend health check
    Health,
    /// Backend name and version
    Info,
    /// Provider configuration stored on the backend
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Local settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Read a provider's configuration (API key masked)
    Get { provider: String },
    /// Upload the local settings as a provider configuration
    Save,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Change settings; unspecified fields keep their value
    Set(SettingsUpdate),
}

#[derive(Args, Debug, Default)]
pub struct SettingsUpdate {
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    /// Provider API base URL
    #[arg(long)]
    pub provider_url: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
}
