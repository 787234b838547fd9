//! Configuration from environment variables and an optional YAML file.
//!
//! ```yaml
//! host: "127.0.0.1"
//! port: 4141
//! model: "github-copilot/gpt-4.1"
//! opencode_path: "/opt/homebrew/bin/opencode"
//! request_timeout_secs: 300
//! stream:
//!   chunk_chars: 4
//!   delay_ms: 5
//! request_log: "opencode_completion_api.log"
//! ```
//!
//! **Environment variables:**
//! - `HOST`: bind address (default: 0.0.0.0)
//! - `PORT`: server port (default: 4141)
//! - `OPENCODE_MODEL`: backing model passed to `opencode --model` (default: github-copilot/gpt-4.1)
//! - `OPENCODE_PATH`: explicit path to the `opencode` executable
//! - `REQUEST_TIMEOUT_SECS`: wall-clock limit per invocation (default: 300)
//! - `STREAM_CHUNK_CHARS`: characters per emulated stream fragment (default: 1)
//! - `STREAM_DELAY_MS`: pause between fragments (default: 10)
//! - `REQUEST_LOG`: append-only request log path, empty to disable (default: opencode_completion_api.log)

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::streaming::StreamSettings;

pub const DEFAULT_PORT: u16 = 4141;
pub const DEFAULT_MODEL: &str = "github-copilot/gpt-4.1";
pub const DEFAULT_REQUEST_LOG: &str = "opencode_completion_api.log";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub opencode_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub stream_chunk_chars: usize,
    pub stream_delay_ms: u64,
    pub request_log: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct BridgeYamlConfig {
    host: Option<String>,
    port: Option<u16>,
    model: Option<String>,
    opencode_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    stream: StreamYamlConfig,
    request_log: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamYamlConfig {
    chunk_chars: Option<usize>,
    delay_ms: Option<u64>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            model: env::var("OPENCODE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            opencode_path: env::var("OPENCODE_PATH").ok().and_then(|p| non_empty_path(&p)),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(300),
            stream_chunk_chars: env_parse("STREAM_CHUNK_CHARS").unwrap_or(1),
            stream_delay_ms: env_parse("STREAM_DELAY_MS").unwrap_or(10),
            request_log: match env::var("REQUEST_LOG") {
                Ok(v) => non_empty_path(&v),
                Err(_) => Some(PathBuf::from(DEFAULT_REQUEST_LOG)),
            },
        }
    }
}

impl BridgeConfig {
    /// Environment defaults overlaid with whatever the YAML file sets.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let yaml: BridgeYamlConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut config = Self::default();
        if let Some(host) = yaml.host {
            config.host = host;
        }
        if let Some(port) = yaml.port {
            config.port = port;
        }
        if let Some(model) = yaml.model {
            config.model = model;
        }
        if let Some(opencode_path) = yaml.opencode_path {
            config.opencode_path = Some(opencode_path);
        }
        if let Some(secs) = yaml.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(chars) = yaml.stream.chunk_chars {
            config.stream_chunk_chars = chars;
        }
        if let Some(ms) = yaml.stream.delay_ms {
            config.stream_delay_ms = ms;
        }
        if let Some(log) = yaml.request_log {
            config.request_log = non_empty_path(&log);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.stream_chunk_chars == 0 {
            bail!("stream chunk size must be at least one character");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            chunk_chars: self.stream_chunk_chars,
            delay: Duration::from_millis(self.stream_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BridgeConfig {
        BridgeConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
            opencode_path: None,
            request_timeout_secs: 300,
            stream_chunk_chars: 1,
            stream_delay_ms: 10,
            request_log: None,
        }
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(base().validate().is_ok());

        let config = BridgeConfig {
            stream_chunk_chars: 0,
            ..base()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            request_timeout_secs: 0,
            ..base()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let config = BridgeConfig {
            stream_chunk_chars: 3,
            stream_delay_ms: 0,
            ..base()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:4141");
        assert_eq!(config.request_timeout(), Duration::from_secs(300));

        let settings = config.stream_settings();
        assert_eq!(settings.chunk_chars, 3);
        assert!(settings.delay.is_zero());
    }

    #[test]
    fn test_empty_log_path_disables_logging() {
        assert_eq!(non_empty_path("  "), None);
        assert_eq!(non_empty_path("a.log"), Some(PathBuf::from("a.log")));
    }
}
