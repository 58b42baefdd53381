use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ChatError, Result};
use crate::models::{ApiConfig, ChatMessage, ChatRequest};

pub const DEMO_PROVIDER: &str = "demo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Provider, model and sampling settings chosen by the user
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSettings {
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::demo(DEFAULT_TEMPERATURE, DEFAULT_MAX_TOKENS)
    }
}

impl ApiSettings {
    /// Demo mode: the backend answers with canned replies, no key needed.
    pub fn demo(temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider: DEMO_PROVIDER.to_string(),
            api_key: "demo_key".to_string(),
            base_url: "demo".to_string(),
            model_name: "demo-model".to_string(),
            temperature,
            max_tokens,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.provider == DEMO_PROVIDER
    }

    pub fn is_configured(&self) -> bool {
        self.is_demo() || (!self.api_key.is_empty() && !self.base_url.is_empty())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model_name.clone(),
        }
    }

    /// A chat request for `messages` using these settings.
    pub fn build_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            messages,
            provider: Some(self.provider.clone()),
            model: Some(self.model_name.clone()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            stream: None,
            api_config: serde_json::to_value(self.api_config()).ok(),
        }
    }
}

/// Settings persisted in a TOML file
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: ApiSettings,
}

impl SettingsStore {
    /// `<config dir>/ai-chat/settings.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ai-chat").join("settings.toml"))
    }

    /// Load settings from `path`, falling back to demo mode.
    ///
    /// A missing or blank file gives the defaults. A file that is not valid
    /// UTF-8 TOML is removed. A non-demo provider without an API key is switched to
    /// demo mode, keeping temperature and max tokens, and saved back.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No saved settings at {}, using demo mode", path.display());
                return Ok(Self {
                    path,
                    settings: ApiSettings::default(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let contents = match String::from_utf8(raw) {
            Ok(contents) => contents,
            Err(e) => return Ok(Self::discard_corrupt(path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Self {
                path,
                settings: ApiSettings::default(),
            });
        }

        let settings = match toml::from_str::<ApiSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => return Ok(Self::discard_corrupt(path, e)),
        };

        let mut store = Self { path, settings };

        if !store.settings.is_demo() && store.settings.api_key.is_empty() {
            warn!(
                "Provider {:?} has no API key, switching to demo mode",
                store.settings.provider
            );
            // Zero counts as unset, like an absent value
            let temperature = match store.settings.temperature {
                t if t > 0.0 => t,
                _ => DEFAULT_TEMPERATURE,
            };
            let max_tokens = match store.settings.max_tokens {
                0 => DEFAULT_MAX_TOKENS,
                n => n,
            };
            store.save(ApiSettings::demo(temperature, max_tokens))?;
        }

        Ok(store)
    }

    /// Remove an unreadable settings file and start over in demo mode.
    fn discard_corrupt(path: PathBuf, reason: impl std::fmt::Display) -> Self {
        warn!(
            "Failed to parse settings at {}, using demo mode: {}",
            path.display(),
            reason
        );
        if let Err(e) = fs::remove_file(&path) {
            warn!("Failed to remove invalid settings file: {}", e);
        }
        Self {
            path,
            settings: ApiSettings::default(),
        }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    /// Replace the settings and write them to disk.
    pub fn save(&mut self, settings: ApiSettings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| ChatError::Settings(format!("Failed to save settings: {}", e)))?;
        }

        let contents = toml::to_string_pretty(&settings)?;
        fs::write(&self.path, contents)
            .map_err(|e| ChatError::Settings(format!("Failed to save settings: {}", e)))?;

        self.settings = settings;
        Ok(())
    }
}
