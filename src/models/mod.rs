pub mod api;
pub mod chat;

pub use api::{ApiConfig, ApiInfo, ConnectionTestResult, HealthStatus};
pub use chat::{ChatMessage, ChatRequest, ChatResponse, Role, StreamChunk};
