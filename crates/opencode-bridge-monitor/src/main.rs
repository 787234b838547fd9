//! opencode-bridge-monitor - keeps an `opencode-bridge` server running.
//!
//! Starts the server, polls `GET /health` on a fixed interval, reports status
//! changes, and restarts the server when it goes offline because its process
//! died.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod status;
mod supervisor;

use status::ServerStatus;
use supervisor::ServerProcess;

#[derive(Debug, Parser)]
#[command(
    name = "opencode-bridge-monitor",
    version,
    about = "Start and monitor the opencode-bridge server"
)]
struct Cli {
    /// Host the server is reachable on
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(long, default_value_t = 4141)]
    port: u16,

    /// Path to the opencode-bridge binary
    #[arg(long)]
    server_bin: Option<PathBuf>,

    /// Seconds between health checks
    #[arg(long, default_value_t = 10)]
    interval_secs: u64,

    /// Seconds to wait after starting the server before the first check
    #[arg(long, default_value_t = 3)]
    startup_grace_secs: u64,

    /// Timeout for each health check, in seconds
    #[arg(long, default_value_t = 5)]
    probe_timeout_secs: u64,

    /// Only observe an already running server; never start or restart it
    #[arg(long)]
    no_spawn: bool,
}

impl Cli {
    fn health_url(&self) -> String {
        format!("http://{}:{}/health", self.host, self.port)
    }
}

fn report(status: ServerStatus) {
    println!("{} {}", status.icon(), status.colored_label());
    tracing::info!(status = %status, "server status changed");
}

fn start_server(process: &mut ServerProcess) -> Option<ServerStatus> {
    match process.start() {
        Ok(_) => None,
        Err(e) => {
            tracing::error!(error = %e, binary = %process.binary_path().display(), "Failed to start server");
            Some(ServerStatus::Error)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let url = cli.health_url();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.probe_timeout_secs))
        .build()?;

    let mut process = ServerProcess::new(
        supervisor::find_server_binary(cli.server_bin.as_deref()),
        cli.port,
    );

    let mut status = ServerStatus::Starting;
    report(status);

    if !cli.no_spawn {
        if let Some(failed) = start_server(&mut process) {
            status = failed;
            report(status);
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            process.stop().await;
            return Ok(());
        }
        _ = tokio::time::sleep(Duration::from_secs(cli.startup_grace_secs)) => {}
    }

    tracing::info!(url = %url, interval_secs = cli.interval_secs, "monitoring server");
    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let next = ServerStatus::from_probe(supervisor::probe(&client, &url).await);
                if next != status {
                    status = next;
                    report(status);
                }

                if supervisor::should_restart(status, cli.no_spawn, process.has_exited()) {
                    tracing::warn!("Server process died, restarting");
                    if let Some(failed) = start_server(&mut process) {
                        status = failed;
                        report(status);
                    }
                }
            }
        }
    }

    process.stop().await;
    Ok(())
}
