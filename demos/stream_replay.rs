use ai_chat_client::models::StreamChunk;
use ai_chat_client::streaming::{StreamCallbacks, read_event_stream};
use bytes::Bytes;
use futures::stream;
use std::fs;
use tokio_util::sync::CancellationToken;

/// Replays a recorded SSE response in small network-sized pieces.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/chat_stream.sse".to_string());
    let recorded = fs::read(&path)?;

    println!("Replaying {} ({} bytes)\n", path, recorded.len());
    println!("{}", "=".repeat(80));

    // Odd chunk size so multi-byte characters get split
    let chunk_size = 7;
    let pieces: Vec<Result<Bytes, std::io::Error>> = recorded
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    println!("{} reads of up to {} bytes\n", pieces.len(), chunk_size);

    let mut chunk_count = 0;
    let mut full_text = String::new();

    let outcome = {
        let mut handler = StreamCallbacks::new(
            |chunk: StreamChunk| {
                chunk_count += 1;
                println!("  chunk {:>2}: {:?}", chunk_count, chunk.content);
                full_text = chunk.full_content;
            },
            |message: String| println!("  error: {}", message),
            || println!("  complete"),
        );
        read_event_stream(stream::iter(pieces), &mut handler, &CancellationToken::new()).await
    };

    println!("\n{}", "=".repeat(80));
    println!("Outcome: {:?}", outcome);
    println!("Chunks:  {}", chunk_count);
    println!("Text:    {}", full_text);

    Ok(())
}
