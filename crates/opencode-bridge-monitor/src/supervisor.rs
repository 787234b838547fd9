//! Bridge server child process: lookup, start, health probe and shutdown.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

use crate::status::{ProbeOutcome, ServerStatus};

pub const SERVER_BINARY: &str = "opencode-bridge";
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Locate the bridge binary: explicit path, next to this executable, then `PATH`.
pub fn find_server_binary(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(SERVER_BINARY)));

    let candidates = [sibling, which::which(SERVER_BINARY).ok()];
    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from(SERVER_BINARY)
}

/// Restart only when the probe found nothing listening and the process this
/// monitor started has exited.
pub fn should_restart(status: ServerStatus, no_spawn: bool, exited: bool) -> bool {
    status == ServerStatus::Offline && !no_spawn && exited
}

pub async fn probe(client: &reqwest::Client, url: &str) -> ProbeOutcome {
    match client.get(url).send().await {
        Ok(resp) => ProbeOutcome::Responded(resp.status().as_u16()),
        Err(e) => {
            tracing::debug!(error = %e, url, "health probe failed");
            ProbeOutcome::Unreachable
        }
    }
}

/// The bridge server child process, when this monitor started one.
pub struct ServerProcess {
    binary_path: PathBuf,
    port: u16,
    child: Option<Child>,
}

impl ServerProcess {
    pub fn new(binary_path: PathBuf, port: u16) -> Self {
        Self {
            binary_path,
            port,
            child: None,
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    pub fn start(&mut self) -> Result<u32> {
        if !self.binary_path.exists() && which::which(&self.binary_path).is_err() {
            bail!(
                "{} binary not found at {} and not in PATH. \
                 Run 'cargo build --release -p opencode-bridge' to build it.",
                SERVER_BINARY,
                self.binary_path.display()
            );
        }

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--port")
            .arg(self.port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd.spawn().with_context(|| {
            format!("Failed to spawn {}", self.binary_path.display())
        })?;

        let pid = child.id().unwrap_or_default();
        tracing::info!(pid, port = self.port, "Spawned opencode-bridge");
        self.child = Some(child);
        Ok(pid)
    }

    /// True when a child was started and has since exited. A dead child is
    /// kept until a later `start` succeeds, so failed restarts are retried.
    pub fn has_exited(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(status = ?status, "opencode-bridge process has exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to check server process status");
                true
            }
        }
    }

    /// SIGTERM, then SIGKILL if the server hasn't exited within the grace period.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        tracing::info!(pid = ?child.id(), "Stopping opencode-bridge");

        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                if let Err(e) = Command::new("kill")
                    .args(["-TERM", &pid.to_string()])
                    .status()
                    .await
                {
                    tracing::warn!(error = %e, "Failed to send SIGTERM");
                }
            }
        }

        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::info!(status = ?status, "Server stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to wait for server"),
            Err(_) => {
                tracing::warn!("Server did not stop gracefully, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill server process");
                }
            }
        }
    }
}
