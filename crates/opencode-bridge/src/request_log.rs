//! Append-only JSON-lines log of requests and replies.
//!
//! Purely informational: nothing reads it back, and a failed write is logged
//! and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct LogEntry<'a> {
    pub timestamp: DateTime<Utc>,
    pub id: &'a str,
    #[serde(flatten)]
    pub event: LogEvent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent<'a> {
    Request {
        requested_model: &'a str,
        stream: bool,
        messages: usize,
        prompt: &'a str,
    },
    Response {
        content: &'a str,
    },
    Error {
        kind: &'a str,
        message: String,
    },
}

pub struct RequestLog {
    path: Option<PathBuf>,
    // Keeps concurrent appends from interleaving within a line.
    write_lock: Mutex<()>,
}

impl RequestLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn record(&self, id: &str, event: LogEvent<'_>) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = LogEntry {
            timestamp: Utc::now(),
            id,
            event,
        };

        let mut line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize request log entry");
                return;
            }
        };
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append(path, line.as_bytes()).await {
            warn!(error = %e, path = %path.display(), "failed to write request log");
        }
    }
}

async fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_one_line_per_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requests.log");
        let log = RequestLog::new(Some(path.clone()));

        log.record(
            "chatcmpl-1",
            LogEvent::Request {
                requested_model: "gpt-4o",
                stream: false,
                messages: 1,
                prompt: "User: hi",
            },
        )
        .await;
        log.record("chatcmpl-1", LogEvent::Response { content: "hello" })
            .await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "request");
        assert_eq!(lines[0]["prompt"], "User: hi");
        assert_eq!(lines[1]["event"], "response");
        assert_eq!(lines[1]["id"], "chatcmpl-1");
        assert_eq!(lines[1]["content"], "hello");
    }

    #[tokio::test]
    async fn test_unwritable_path_is_ignored() {
        let dir = TempDir::new().unwrap();
        let log = RequestLog::new(Some(dir.path().join("missing").join("requests.log")));
        log.record("id", LogEvent::Response { content: "x" }).await;
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_disabled_log_writes_nothing() {
        let log = RequestLog::disabled();
        assert!(log.path().is_none());
        log.record("id", LogEvent::Response { content: "x" }).await;
    }
}
