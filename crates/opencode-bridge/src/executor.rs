//! `opencode` subprocess invocation.

use async_trait::async_trait;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::translation;

const EXECUTABLE_NAME: &str = "opencode";

/// Something that turns a prompt into a finished reply.
///
/// The server only talks to this trait, so tests can swap the real CLI out.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, BridgeError>;
}

/// Runs `opencode --model <model> run -` with the prompt on stdin.
pub struct OpenCodeExecutor {
    program: PathBuf,
    model: String,
    timeout: Duration,
}

impl OpenCodeExecutor {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_program(
            resolve_executable(config.opencode_path.as_deref()),
            config.model.clone(),
            config.request_timeout(),
        )
    }

    pub fn with_program(
        program: impl Into<PathBuf>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Directories the CLI installer and package managers commonly use. These are
/// searched after `PATH` and are also prepended to the child's `PATH`, since
/// launchd-style parents often start us with a minimal environment.
fn extra_search_dirs() -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/opt/homebrew/bin"),
        PathBuf::from("/usr/bin"),
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".opencode").join("bin"));
        candidates.push(home.join(".local").join("bin"));
        candidates.push(home.join("bin"));
    }
    candidates
}

/// Locate the `opencode` executable.
///
/// Order: explicit path, `PATH`, common install locations, then the bare
/// name (left for the OS to resolve at spawn time).
pub fn resolve_executable(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(found) = which::which(EXECUTABLE_NAME) {
        debug!(path = %found.display(), "found opencode via PATH");
        return found;
    }

    for dir in extra_search_dirs() {
        let candidate = dir.join(EXECUTABLE_NAME);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "found opencode in common location");
            return candidate;
        }
    }

    warn!("could not find opencode executable, falling back to 'opencode'");
    PathBuf::from(EXECUTABLE_NAME)
}

fn extended_path() -> OsString {
    let mut paths = extra_search_dirs();
    if let Some(current) = env::var_os("PATH") {
        paths.extend(env::split_paths(&current));
    }
    env::join_paths(paths).unwrap_or_else(|_| env::var_os("PATH").unwrap_or_default())
}

#[async_trait]
impl Assistant for OpenCodeExecutor {
    async fn complete(&self, prompt: &str) -> Result<String, BridgeError> {
        let wrapped = translation::wrap_prompt(prompt);

        debug!(
            program = %self.program.display(),
            model = %self.model,
            prompt_chars = wrapped.chars().count(),
            "starting opencode"
        );

        let mut cmd = Command::new(&self.program);
        cmd.arg("--model")
            .arg(&self.model)
            .arg("run")
            .arg("-")
            .env("PATH", extended_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            BridgeError::upstream(format!(
                "failed to start {}: {}",
                self.program.display(),
                e
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::upstream("opencode stdin was not captured"))?;

        let feed = async move {
            stdin.write_all(wrapped.as_bytes()).await?;
            stdin.shutdown().await
        };

        // Dropping the child on timeout kills it (`kill_on_drop`).
        let run = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            if let Err(e) = fed {
                debug!(error = %e, "opencode closed stdin early");
            }
            output
        };

        let output = match timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(BridgeError::upstream(format!(
                    "failed to wait for opencode: {}",
                    e
                )))
            }
            Err(_) => return Err(BridgeError::Timeout(self.timeout)),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            debug!(stderr = %stderr, "opencode stderr output");
        }

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "termination by signal".to_string());
            return Err(BridgeError::upstream(if stderr.is_empty() {
                status
            } else {
                format!("{}: {}", status, stderr)
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply = translation::extract_reply(&stdout, &self.model);
        if reply.is_empty() {
            warn!("opencode completed successfully but produced no output");
        }
        debug!(reply_chars = reply.chars().count(), "opencode finished");

        Ok(reply)
    }
}
