//! # AI Chat Client
//!
//! A client for the AI Chat backend: streamed and one-shot chat, plus the
//! backend's configuration and status endpoints.
//!
//! ## Overview
//!
//! The core is the streaming reader. It takes the raw body of a
//! `text/event-stream` response and:
//! - decodes UTF-8 incrementally, so characters split across reads survive
//! - reassembles newline-terminated `data:` lines
//! - parses each payload and reports content, errors and completion to a
//!   [`StreamHandler`](streaming::StreamHandler)
//! - stops promptly and silently when its cancellation token fires
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_chat_client::{ChatClient, ClientConfig};
//! use ai_chat_client::models::{ChatMessage, ChatRequest};
//! use ai_chat_client::streaming::StreamEvent;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new(ClientConfig::from_env()?)?;
//! let request = ChatRequest::new(vec![ChatMessage::user("Hello")]);
//!
//! let mut events: Vec<StreamEvent> = Vec::new();
//! let outcome = client
//!     .stream_chat(request, &mut events, &CancellationToken::new())
//!     .await;
//! println!("{:?}: {} events", outcome, events.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`client`] - HTTP client for the streaming and plain endpoints
//! - [`config`] - Base URL and timeouts
//! - [`error`] - Error types and handling
//! - [`models`] - Wire types
//! - [`settings`] - Persisted provider settings
//! - [`streaming`] - UTF-8 decoding, SSE framing and the read loop
//! - [`cli`] - The `ai-chat` command line

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod settings;
pub mod streaming;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::{ChatError, Result};
