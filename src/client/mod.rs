mod api;
mod stream;

use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use std::pin::Pin;

use crate::config::ClientConfig;
use crate::error::{ChatError, Result};

pub use api::CONNECTION_TEST_FALLBACK;

/// Raw body of a streaming response
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Client for the chat backend.
///
/// Cloning is cheap and clones share one connection pool. Every call owns
/// its own parsing state, so concurrent calls never see each other's data.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    config: ClientConfig,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        // No total timeout here: it would cut long streams short. Plain
        // requests set one per call.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
