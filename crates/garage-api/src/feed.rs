//! Server-sent-event change feed for a single database node.
//!
//! The database streams `put` / `patch` edits relative to the watched path.
//! Each edit is folded into a [`Document`] and the whole document is handed
//! to the listener as a [`FeedEvent::Snapshot`]. The feed never reconnects
//! on its own: a `cancel` / `auth_revoked` frame, a transport error, or the
//! end of the stream all produce one final [`FeedEvent::Cancelled`].

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::client::check_status;
use crate::document::Document;
use crate::error::Error;

/// What a listener receives from a change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The whole document at the watched path after a change.
    Snapshot(Value),
    /// The feed was torn down. No further events follow.
    Cancelled { reason: String },
}

// ── Frame decoding ──────────────────────────────────────────────────

/// One `event:` / `data:` block of a text/event-stream body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: String,
    pub data: String,
}

impl SseFrame {
    fn parse(block: &str) -> Option<Self> {
        let mut frame = Self::default();
        let mut seen = false;

        for line in block.lines() {
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => {
                    frame.event = value.to_owned();
                    seen = true;
                }
                "data" => {
                    if !frame.data.is_empty() {
                        frame.data.push('\n');
                    }
                    frame.data.push_str(value);
                    seen = true;
                }
                _ => {}
            }
        }

        seen.then_some(frame)
    }
}

/// Incremental splitter for a chunked text/event-stream body.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Append a body chunk and return every frame it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(frame) = SseFrame::parse(&String::from_utf8_lossy(&block)) {
                frames.push(frame);
            }
        }
        frames
    }
}

// ── Database events ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PathUpdate {
    path: String,
    data: Value,
}

#[derive(Debug)]
pub(crate) enum ServerEvent {
    Put { path: String, data: Value },
    Patch { path: String, data: Value },
    KeepAlive,
    Cancel(String),
    AuthRevoked,
    Other(String),
}

impl ServerEvent {
    pub(crate) fn from_frame(frame: SseFrame) -> Result<Self, Error> {
        let update = |data: &str| {
            serde_json::from_str::<PathUpdate>(data).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: data.to_owned(),
            })
        };

        Ok(match frame.event.as_str() {
            "put" => {
                let PathUpdate { path, data } = update(&frame.data)?;
                Self::Put { path, data }
            }
            "patch" => {
                let PathUpdate { path, data } = update(&frame.data)?;
                Self::Patch { path, data }
            }
            "keep-alive" => Self::KeepAlive,
            "cancel" => Self::Cancel(cancel_reason(&frame.data)),
            "auth_revoked" => Self::AuthRevoked,
            _ => Self::Other(frame.event),
        })
    }
}

fn cancel_reason(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(s)) => s,
        Ok(Value::Null) | Err(_) if data.trim().is_empty() || data.trim() == "null" => {
            "cancelled by server".to_owned()
        }
        _ => data.to_owned(),
    }
}

// ── Background feed task ────────────────────────────────────────────

/// Drive one change feed until it ends or the receiver is dropped.
pub(crate) async fn feed_loop(http: reqwest::Client, url: Url, tx: mpsc::Sender<FeedEvent>) {
    let reason = tokio::select! {
        biased;
        () = tx.closed() => {
            tracing::debug!("feed receiver dropped, closing stream");
            return;
        }
        result = read_feed(&http, &url, &tx) => match result {
            Ok(reason) => reason,
            Err(e) => {
                tracing::warn!(error = %e, "change feed failed");
                e.to_string()
            }
        },
    };

    tracing::info!(reason = %reason, "change feed closed");
    let _ = tx.send(FeedEvent::Cancelled { reason }).await;
}

async fn read_feed(
    http: &reqwest::Client,
    url: &Url,
    tx: &mpsc::Sender<FeedEvent>,
) -> Result<String, Error> {
    let response = http
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?;
    let response = check_status(response).await?;

    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut document = Document::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for frame in decoder.push(&chunk) {
            let event = match ServerEvent::from_frame(frame) {
                Ok(event) => event,
                Err(Error::Deserialization { message, body }) => {
                    tracing::warn!(
                        error = %message,
                        body = %body,
                        "skipping undecodable feed frame"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            match event {
                ServerEvent::Put { path, data } => document.put(&path, data),
                ServerEvent::Patch { path, data } => document.patch(&path, data),
                ServerEvent::KeepAlive => {
                    tracing::trace!("feed keep-alive");
                    continue;
                }
                ServerEvent::Cancel(reason) => return Ok(reason),
                ServerEvent::AuthRevoked => return Ok("auth revoked".to_owned()),
                ServerEvent::Other(event) => {
                    tracing::debug!(event, "ignoring unknown feed event");
                    continue;
                }
            }

            if tx
                .send(FeedEvent::Snapshot(document.value().clone()))
                .await
                .is_err()
            {
                return Ok("listener dropped".to_owned());
            }
        }
    }

    Ok("stream ended".to_owned())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decoder_splits_frames_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: put\ndata: {\"path\":\"/\",").is_empty());

        let frames = decoder.push(b"\"data\":1}\n\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame {
                    event: "put".into(),
                    data: r#"{"path":"/","data":1}"#.into(),
                },
                SseFrame {
                    event: "keep-alive".into(),
                    data: "null".into(),
                },
            ]
        );
    }

    #[test]
    fn decoder_tolerates_crlf() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"event: cancel\r\ndata: null\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "cancel");
    }

    #[test]
    fn put_frame_parses_path_and_data() {
        let frame = SseFrame {
            event: "put".into(),
            data: r#"{"path":"/type","data":"OPENING"}"#.into(),
        };
        match ServerEvent::from_frame(frame) {
            Ok(ServerEvent::Put { path, data }) => {
                assert_eq!(path, "/type");
                assert_eq!(data, json!("OPENING"));
            }
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[test]
    fn malformed_put_is_a_deserialization_error() {
        let frame = SseFrame {
            event: "put".into(),
            data: "not json".into(),
        };
        assert!(matches!(
            ServerEvent::from_frame(frame),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn cancel_reason_defaults_when_empty() {
        assert_eq!(cancel_reason("null"), "cancelled by server");
        assert_eq!(cancel_reason(r#""Permission denied""#), "Permission denied");
    }
}
