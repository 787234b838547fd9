//! `opencode-bridge` binary entrypoint.
//!
//! Configuration comes from environment variables, optionally overlaid by a
//! YAML file (`--config`), then by command-line flags.

use clap::Parser;
use opencode_bridge::{serve, BridgeConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "opencode-bridge", version, about = "OpenAI-compatible API for the opencode CLI")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Backing model passed to `opencode --model`
    #[arg(short, long)]
    model: Option<String>,

    /// Path to the opencode executable
    #[arg(long)]
    opencode_path: Option<PathBuf>,

    /// Per-request timeout for the opencode process, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Append-only request log, or "" to disable
    #[arg(long)]
    request_log: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_yaml_file(path)?,
            None => BridgeConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(path) = self.opencode_path {
            config.opencode_path = Some(path);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(log) = self.request_log {
            config.request_log = (!log.trim().is_empty()).then(|| PathBuf::from(log));
        }

        Ok(config)
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Respect `RUST_LOG` if set; otherwise default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    serve(config).await
}
