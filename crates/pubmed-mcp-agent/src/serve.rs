//! Line-delimited JSON over a reader/writer pair (stdin/stdout in the binary).
//!
//! One request object per input line, one compact response envelope per
//! output line. Blank lines are skipped; malformed lines get an
//! `invalid_request` envelope and the loop keeps going.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::dispatch::{Dispatcher, Response};

/// Parse one request line; anything but valid JSON becomes an `invalid_request` envelope.
pub async fn respond(dispatcher: &Dispatcher, line: &str) -> Response {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => dispatcher.handle_value(value).await,
        Err(e) => Response::invalid_request(format!("request is not valid JSON: {e}")),
    }
}

/// Serve until the reader reaches EOF. Returns the number of requests answered.
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> anyhow::Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Serving line-delimited requests");
    let mut lines = BufReader::new(reader).lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(len = line.len(), "Received request line");

        let response = respond(dispatcher, line).await;
        let encoded = serde_json::to_string(&response)?;
        writer.write_all(encoded.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        answered += 1;
    }

    info!(answered, "Input closed, shutting down");
    Ok(answered)
}
