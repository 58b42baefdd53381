use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::ChatClient;
use crate::error::{ChatError, Result, SEND_FALLBACK};
use crate::models::{ApiConfig, ApiInfo, ChatRequest, ChatResponse, ConnectionTestResult, HealthStatus};

/// Reported when a connection test fails without a server-supplied reason.
pub const CONNECTION_TEST_FALLBACK: &str = "Connection test failed";

impl ChatClient {
    /// Single request/response chat exchange.
    ///
    /// The error carries the most specific text available: the server's
    /// `detail`, then the transport error, then a generic fallback.
    pub async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.call(Method::POST, "/api/chat", Some(request))
            .await
            .map_err(|e| match e {
                ChatError::Transport {
                    message,
                    unreachable,
                } if message.trim().is_empty() => ChatError::Transport {
                    message: SEND_FALLBACK.to_string(),
                    unreachable,
                },
                other => other,
            })
    }

    /// Ask the backend to try a provider configuration.
    ///
    /// Only a server-supplied `detail` survives; other failures are reported
    /// as a generic connection-test failure.
    pub async fn test_connection(&self, config: &ApiConfig) -> Result<ConnectionTestResult> {
        self.call(Method::POST, "/api/test-connection", Some(config))
            .await
            .map_err(|e| match e {
                ChatError::HttpStatus {
                    has_detail: true, ..
                } => e,
                ChatError::HttpStatus { status, .. } => ChatError::HttpStatus {
                    status,
                    message: CONNECTION_TEST_FALLBACK.to_string(),
                    has_detail: false,
                },
                ChatError::Transport { unreachable, .. } => ChatError::Transport {
                    message: CONNECTION_TEST_FALLBACK.to_string(),
                    unreachable,
                },
                other => other,
            })
    }

    /// Store a provider configuration on the backend.
    pub async fn save_config(&self, config: &ApiConfig) -> Result<serde_json::Value> {
        self.call(Method::POST, "/api/config", Some(config)).await
    }

    /// Read back a provider configuration. The backend masks the API key.
    pub async fn get_config(&self, provider: &str) -> Result<ApiConfig> {
        if provider.is_empty() || provider.contains('/') {
            return Err(ChatError::Config(format!(
                "Invalid provider name: {:?}",
                provider
            )));
        }
        let path = format!("/api/config/{}", provider);
        self.call::<(), _>(Method::GET, &path, None).await
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.call::<(), _>(Method::GET, "/health", None).await
    }

    pub async fn get_info(&self) -> Result<ApiInfo> {
        self.call::<(), _>(Method::GET, "/", None).await
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!("Sending request: {} {}", method, url);

        let mut builder: RequestBuilder = self
            .client
            .request(method.clone(), &url)
            .timeout(self.config.request_timeout())
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Request error: {} {}: {}", method, url, e);
            ChatError::from_transport(&e)
        })?;

        let status = response.status();
        debug!("Received response: {} {}", status, url);

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = ChatError::from_status(status, &body);
            warn!("Response error: {} {}: {}", status, url, err);
            return Err(err);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::from_transport(&e))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            ChatError::InvalidResponse(format!("Unexpected response from {}: {}", path, e))
        })
    }
}
