//! Streaming emulation (SSE).
//!
//! `opencode run` only hands back its reply once it has finished, so there is
//! no native token stream to forward. Instead the finished text is sliced into
//! fragments after the fact and replayed as OpenAI `chat.completion.chunk`
//! frames:
//!
//! ```text
//! data: {"choices":[{"delta":{"role":"assistant","content":""}, ...}], ...}
//!
//! data: {"choices":[{"delta":{"content":"H"}, ...}], ...}
//!
//! data: {"choices":[{"delta":{},"finish_reason":"stop", ...}], ...}
//!
//! data: [DONE]
//!
//! ```
//!
//! The stream ends early if the client disconnects, since actix drops the
//! response body and nothing polls the generator again.

use crate::types::{ChatCompletionChunk, Delta, Role};
use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use std::time::Duration;

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Unicode scalar values per fragment. Must be at least 1.
    pub chunk_chars: usize,
    /// Pause between consecutive fragments.
    pub delay: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_chars: 1,
            delay: Duration::from_millis(10),
        }
    }
}

/// Split `text` into consecutive slices of at most `chunk_chars` characters,
/// never cutting inside a UTF-8 sequence.
pub fn fragment(text: &str, chunk_chars: usize) -> Vec<&str> {
    let chunk_chars = chunk_chars.max(1);
    let mut out = Vec::new();
    let mut start = 0;

    for (count, (idx, _)) in text.char_indices().enumerate() {
        if count > 0 && count % chunk_chars == 0 {
            out.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }

    out
}

/// Format one SSE `data:` frame.
pub fn sse_data<T: Serialize>(payload: &T) -> String {
    match serde_json::to_string(payload) {
        Ok(json) => format!("data: {json}\n\n"),
        Err(e) => {
            let error_payload = serde_json::json!({ "error": { "message": e.to_string() } });
            format!("data: {error_payload}\n\n")
        }
    }
}

/// Replay a finished reply as a sequence of fully formatted SSE frames.
pub fn completion_stream(
    id: String,
    model: String,
    created: i64,
    text: String,
    settings: StreamSettings,
) -> impl Stream<Item = String> + Send + 'static {
    stream! {
        yield sse_data(&ChatCompletionChunk::new(
            &id,
            &model,
            created,
            Delta {
                role: Some(Role::Assistant),
                content: Some(String::new()),
            },
            None,
        ));

        for (i, piece) in fragment(&text, settings.chunk_chars).into_iter().enumerate() {
            if i > 0 && !settings.delay.is_zero() {
                tokio::time::sleep(settings.delay).await;
            }
            yield sse_data(&ChatCompletionChunk::new(
                &id,
                &model,
                created,
                Delta {
                    role: None,
                    content: Some(piece.to_string()),
                },
                None,
            ));
        }

        yield sse_data(&ChatCompletionChunk::new(
            &id,
            &model,
            created,
            Delta::default(),
            Some("stop"),
        ));
        yield DONE_FRAME.to_string();
    }
}
