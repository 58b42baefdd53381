use reqwest::StatusCode;
use thiserror::Error;

/// Shown when the backend cannot be reached at all.
pub const UNREACHABLE_HINT: &str = "Unable to reach the backend API service, check that it is running";

/// Shown when a request exceeds its timeout.
pub const TIMEOUT_HINT: &str = "Request timed out, please try again later";

/// Last-resort message for a failed chat request.
pub const SEND_FALLBACK: &str = "Failed to send message, please try again later";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Transport error: {message}")]
    Transport { message: String, unreachable: bool },

    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: StatusCode,
        message: String,
        /// Whether `message` came from the server's `detail` field
        has_detail: bool,
    },

    #[error("Stream error: {0}")]
    StreamProtocol(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl ChatError {
    /// Classify a reqwest failure, attaching a hint for the common
    /// "backend not running" and timeout cases.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            ChatError::Transport {
                message: UNREACHABLE_HINT.to_string(),
                unreachable: true,
            }
        } else if err.is_timeout() {
            ChatError::Transport {
                message: TIMEOUT_HINT.to_string(),
                unreachable: false,
            }
        } else {
            ChatError::Transport {
                message: err.to_string(),
                unreachable: false,
            }
        }
    }

    /// Build an error for a non-success response from its status and raw body.
    ///
    /// The `detail` field of a JSON body wins; anything else falls back to a
    /// status-derived message.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        match error_detail(body) {
            Some(detail) => ChatError::HttpStatus {
                status,
                message: detail,
                has_detail: true,
            },
            None => ChatError::HttpStatus {
                status,
                message: status_message(status),
                has_detail: false,
            },
        }
    }

    /// The text a user should see for this error.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Transport { message, .. }
            | ChatError::HttpStatus { message, .. }
            | ChatError::StreamProtocol(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Like [`user_message`](Self::user_message), but never empty.
    pub fn user_message_or(&self, fallback: &str) -> String {
        let message = self.user_message();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

    /// Whether the message came from the server's `detail` envelope.
    pub fn has_server_detail(&self) -> bool {
        matches!(
            self,
            ChatError::HttpStatus {
                has_detail: true,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::from_transport(&err)
    }
}

/// Extract the `detail` field from a JSON error envelope.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn status_message(status: StatusCode) -> String {
    format!("Request failed with status code {}", status.as_u16())
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_preferred_over_status() {
        let err = ChatError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"detail":"model overloaded"}"#,
        );
        assert_eq!(err.user_message(), "model overloaded");
        assert!(err.has_server_detail());
    }

    #[test]
    fn test_status_fallback_without_detail() {
        let err = ChatError::from_status(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        assert_eq!(err.user_message(), "Request failed with status code 502");
        assert!(!err.has_server_detail());

        let err = ChatError::from_status(StatusCode::NOT_FOUND, br#"{"error":"nope"}"#);
        assert_eq!(err.user_message(), "Request failed with status code 404");
    }

    #[test]
    fn test_structured_detail_rendered_as_json() {
        let body = br#"{"detail":[{"loc":["body","messages"],"msg":"field required"}]}"#;
        let detail = error_detail(body).unwrap();
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_empty_message_uses_fallback() {
        let err = ChatError::Transport {
            message: String::new(),
            unreachable: false,
        };
        assert_eq!(err.user_message_or(SEND_FALLBACK), SEND_FALLBACK);

        let err = ChatError::StreamProtocol("quota exceeded".to_string());
        assert_eq!(err.user_message_or(SEND_FALLBACK), "quota exceeded");
    }
}
