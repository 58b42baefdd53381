use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ChatError;
use crate::streaming::decoder::Utf8StreamDecoder;
use crate::streaming::handler::{StreamHandler, StreamOutcome};
use crate::streaming::sse::{MAX_LINE_BYTES, SseFrame, SseLineBuffer, parse_line};

/// Drive one SSE response body to its end, reporting to `handler`.
///
/// The body is consumed and dropped on every exit path. Cancellation is
/// checked while waiting for the next read and before each buffered line;
/// once it is seen nothing else reaches the handler and whatever is still
/// buffered is thrown away.
pub async fn read_event_stream<S, B, E, H>(
    mut body: S,
    handler: &mut H,
    cancel: &CancellationToken,
) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ChatError>,
    H: StreamHandler + ?Sized,
{
    let mut decoder = Utf8StreamDecoder::new();
    let mut lines = SseLineBuffer::new();
    let mut chunks = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(chunks, "Stream cancelled while waiting for data");
                return StreamOutcome::Cancelled;
            }
            next = body.next() => next,
        };

        let bytes = match next {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                let err: ChatError = e.into();
                error!(error = %err, chunks, "Stream read failed");
                let message = err.user_message();
                handler.on_error(message.clone());
                return StreamOutcome::Errored(message);
            }
            None => break,
        };

        let text = decoder.decode(bytes.as_ref());
        for line in lines.push(&text) {
            if cancel.is_cancelled() {
                debug!(chunks, "Stream cancelled, dropping buffered lines");
                return StreamOutcome::Cancelled;
            }

            let Some(frame) = parse_line(&line) else {
                continue;
            };

            match frame {
                SseFrame::Done => {
                    info!(chunks, "Stream completed");
                    handler.on_complete();
                    return StreamOutcome::Completed;
                }
                SseFrame::Content(chunk) => {
                    chunks += 1;
                    handler.on_chunk(chunk);
                }
                SseFrame::Error(message) => {
                    let err = ChatError::StreamProtocol(message);
                    error!(error = %err, chunks, "Server reported stream error");
                    let message = err.user_message();
                    handler.on_error(message.clone());
                    return StreamOutcome::Errored(message);
                }
                SseFrame::Other(frame_type) => {
                    debug!(frame_type = %frame_type, "Ignoring frame");
                }
                SseFrame::Malformed { data, reason } => {
                    warn!(%reason, %data, "Skipping malformed stream frame");
                }
            }
        }

        if lines.pending().len() > MAX_LINE_BYTES {
            if cancel.is_cancelled() {
                return StreamOutcome::Cancelled;
            }
            let err = ChatError::StreamProtocol(format!(
                "Stream line exceeded {} bytes without a newline",
                MAX_LINE_BYTES
            ));
            error!(error = %err, chunks, "Stream line too long");
            let message = err.user_message();
            handler.on_error(message.clone());
            return StreamOutcome::Errored(message);
        }
    }

    if !lines.is_empty() || decoder.pending_len() > 0 {
        debug!(
            tail = lines.pending(),
            undecoded = decoder.pending_len(),
            "Discarding unterminated data at end of stream"
        );
    }

    info!(chunks, "Stream ended without sentinel");
    handler.on_complete();
    StreamOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::handler::StreamEvent;
    use bytes::Bytes;
    use futures::stream;

    fn body(parts: &[&str]) -> impl Stream<Item = Result<Bytes, ChatError>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn run(parts: &[&str]) -> (StreamOutcome, Vec<StreamEvent>) {
        let mut events = Vec::new();
        let outcome =
            read_event_stream(body(parts), &mut events, &CancellationToken::new()).await;
        (outcome, events)
    }

    fn contents(events: &[StreamEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Chunk(c) => Some(c.content.clone()),
                _ => None,
            })
            .collect()
    }

    fn terminals(events: &[StreamEvent]) -> usize {
        events
            .iter()
            .filter(|e| !matches!(e, StreamEvent::Chunk(_)))
            .count()
    }

    #[tokio::test]
    async fn test_single_chunk_then_done() {
        let (outcome, events) = run(&[
            "data: {\"type\":\"content\",\"content\":\"Hi\",\"full_content\":\"Hi\"}\n\ndata: [DONE]\n\n",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(contents(&events), vec!["Hi"]);
        assert_eq!(events.last(), Some(&StreamEvent::Complete));
        assert_eq!(terminals(&events), 1);
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let (outcome, events) = run(&[
            "data: {\"typ",
            "e\":\"content\",\"content\":\"ok\",\"full_content\":\"ok\"}",
            "\n",
            "data: [DONE]\n",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(contents(&events), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_reads() {
        let line = "data: {\"type\":\"content\",\"content\":\"你好\",\"full_content\":\"你好\"}\n";
        let bytes = line.as_bytes();
        // Cut inside the first three-byte character
        let cut = line.find('你').unwrap() + 1;

        let parts: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..cut])),
            Ok(Bytes::copy_from_slice(&bytes[cut..])),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
        ];
        let mut events = Vec::new();
        let outcome = read_event_stream(
            stream::iter(parts),
            &mut events,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(contents(&events), vec!["你好"]);
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_stop_stream() {
        let (outcome, events) = run(&[
            "data: {not json}\ndata: {\"type\":\"content\",\"content\":\"a\",\"full_content\":\"a\"}\n",
            "data: {\"type\":\"content\",\"content\":\"b\",\"full_content\":\"ab\"}\ndata: [DONE]\n",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(contents(&events), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_lines_after_done_are_dropped() {
        let (outcome, events) = run(&[
            "data: [DONE]\ndata: {\"type\":\"content\",\"content\":\"late\",\"full_content\":\"late\"}\n",
            "data: {\"error\":true,\"message\":\"never seen\"}\n",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(events, vec![StreamEvent::Complete]);
    }

    #[tokio::test]
    async fn test_error_frame_terminates() {
        let (outcome, events) = run(&[
            "data: {\"error\":true,\"message\":\"quota exceeded\"}\n",
            "data: {\"type\":\"content\",\"content\":\"x\",\"full_content\":\"x\"}\n",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Errored("quota exceeded".to_string()));
        assert_eq!(
            events,
            vec![StreamEvent::Error("quota exceeded".to_string())]
        );
    }

    #[tokio::test]
    async fn test_end_of_stream_without_done_completes() {
        let (outcome, events) = run(&[
            ": keep-alive\n",
            "data: {\"type\":\"content\",\"content\":\"x\",\"full_content\":\"x\"}\n",
            "data: {\"type\":\"content\",\"content\":\"unterminated\"",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(contents(&events), vec!["x"]);
        assert_eq!(events.last(), Some(&StreamEvent::Complete));
    }

    #[tokio::test]
    async fn test_unknown_frame_types_ignored() {
        let (outcome, events) = run(&[
            "data: {\"type\":\"usage\",\"tokens\":5}\ndata: [DONE]\n",
        ])
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(events, vec![StreamEvent::Complete]);
    }

    #[tokio::test]
    async fn test_read_error_reported_once() {
        let parts: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"type\":\"content\",\"content\":\"a\",\"full_content\":\"a\"}\n",
            )),
            Err(ChatError::Transport {
                message: "connection reset".to_string(),
                unreachable: false,
            }),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
        ];
        let mut events = Vec::new();
        let outcome = read_event_stream(
            stream::iter(parts),
            &mut events,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Errored("connection reset".to_string()));
        assert_eq!(contents(&events), vec!["a"]);
        assert_eq!(terminals(&events), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_first_byte() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut events = Vec::new();
        let outcome = read_event_stream(
            stream::pending::<Result<Bytes, ChatError>>(),
            &mut events,
            &cancel,
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_unblocks_pending_read() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let first = stream::iter(vec![Ok::<_, ChatError>(Bytes::from_static(
            b"data: {\"type\":\"content\",\"content\":\"a\",\"full_content\":\"a\"}\n",
        ))]);
        let body = first.chain(stream::pending());

        let mut events = Vec::new();
        let reader = read_event_stream(body, &mut events, &cancel);
        let canceller = async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        };
        let (outcome, ()) = tokio::join!(reader, canceller);

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(terminals(&events), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_drops_remaining_lines() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut seen = 0;

        let outcome = {
            let mut handler = crate::streaming::handler::StreamCallbacks::new(
                |_| {
                    seen += 1;
                    trigger.cancel();
                },
                |_| panic!("no error expected"),
                || panic!("no completion expected"),
            );
            read_event_stream(
                body(&[
                    "data: {\"type\":\"content\",\"content\":\"a\",\"full_content\":\"a\"}\ndata: {\"type\":\"content\",\"content\":\"b\",\"full_content\":\"ab\"}\ndata: [DONE]\n",
                ]),
                &mut handler,
                &cancel,
            )
            .await
        };

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn test_unterminated_line_is_capped() {
        let half = "x".repeat(MAX_LINE_BYTES / 2 + 1);
        let (outcome, events) = run(&[
            "data: {\"type\":\"content\",\"content\":\"ok\",\"full_content\":\"ok\"}\n",
            "data: ",
            half.as_str(),
            half.as_str(),
            "\ndata: [DONE]\n",
        ])
        .await;

        assert!(matches!(outcome, StreamOutcome::Errored(ref m) if m.contains("without a newline")));
        assert_eq!(contents(&events), vec!["ok"]);
        assert_eq!(terminals(&events), 1);
        assert!(matches!(events.last(), Some(StreamEvent::Error(_))));
    }
}
