use crate::error::{ChatError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STREAM_PATH: &str = "/api/chat/stream";

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Path of the SSE chat endpoint, relative to `base_url`.
    pub stream_path: String,
    /// Total timeout for non-streaming requests.
    pub request_timeout_secs: u64,
    /// Connect timeout, applied to every request including streams.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let base_url = env::var("AI_CHAT_BASE_URL").unwrap_or(defaults.base_url);
        let stream_path = env::var("AI_CHAT_STREAM_PATH").unwrap_or(defaults.stream_path);

        let request_timeout_secs = parse_secs("AI_CHAT_TIMEOUT_SECS")?
            .unwrap_or(defaults.request_timeout_secs);
        let connect_timeout_secs = parse_secs("AI_CHAT_CONNECT_TIMEOUT_SECS")?
            .unwrap_or(defaults.connect_timeout_secs);

        Ok(ClientConfig {
            base_url,
            stream_path,
            request_timeout_secs,
            connect_timeout_secs,
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| ChatError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: ClientConfig = toml::from_str(&contents)
            .map_err(|e| ChatError::Config(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        if let Ok(base_url) = env::var("AI_CHAT_BASE_URL") {
            config.base_url = base_url;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ChatError::Config("Base URL is empty".to_string()));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| ChatError::Config(format!("Invalid base URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        if !self.stream_path.starts_with('/') {
            return Err(ChatError::Config(
                "Stream path must start with '/'".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ChatError::Config(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn stream_url(&self) -> String {
        self.endpoint(&self.stream_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_secs(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ChatError::Config(format!("Invalid {} value: {}", var, e))),
        Err(_) => Ok(None),
    }
}
