use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{ByteStream, ChatClient};
use crate::error::{ChatError, Result};
use crate::models::ChatRequest;
use crate::streaming::{StreamEvent, StreamHandler, StreamOutcome, read_event_stream};

impl ChatClient {
    /// Send `request` to the streaming endpoint and feed the reply to `handler`.
    ///
    /// `stream` is always sent as `true`. Failures reach the handler through
    /// a single `on_error` call and are also returned in the outcome.
    /// Cancelling `cancel` at any point ends the call quietly with
    /// [`StreamOutcome::Cancelled`] and no further handler calls.
    pub async fn stream_chat<H>(
        &self,
        mut request: ChatRequest,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> StreamOutcome
    where
        H: StreamHandler + ?Sized,
    {
        request.stream = Some(true);

        if cancel.is_cancelled() {
            debug!("Stream cancelled before connecting");
            return StreamOutcome::Cancelled;
        }

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Stream cancelled while connecting");
                return StreamOutcome::Cancelled;
            }
            opened = self.open_stream(&request) => opened,
        };

        match opened {
            Ok(body) => read_event_stream(body, handler, cancel).await,
            Err(e) => {
                error!(error = %e, "Failed to open chat stream");
                let message = e.user_message();
                handler.on_error(message.clone());
                StreamOutcome::Errored(message)
            }
        }
    }

    /// Run [`stream_chat`](Self::stream_chat) on a task, delivering events
    /// over a channel.
    pub fn spawn_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> (JoinHandle<StreamOutcome>, UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();

        let handle = tokio::spawn(async move {
            let mut tx = tx;
            client.stream_chat(request, &mut tx, &cancel).await
        });

        (handle, rx)
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let url = self.config.stream_url();
        info!(
            "Opening chat stream: {} ({} messages, provider {:?})",
            url,
            request.messages.len(),
            request.provider
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::from_transport(&e))?;

        let status = response.status();
        info!("Chat stream responded with status: {}", status);

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ChatError::from_status(status, &body));
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}
