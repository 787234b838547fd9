//! Health classification for the bridge server.

use colored::{ColoredString, Colorize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Starting,
    Online,
    Offline,
    Error,
}

/// Result of one `GET /health` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with this HTTP status.
    Responded(u16),
    /// Connection refused, timed out, or otherwise failed.
    Unreachable,
}

impl ServerStatus {
    pub fn from_probe(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Responded(200) => ServerStatus::Online,
            ProbeOutcome::Responded(_) => ServerStatus::Error,
            ProbeOutcome::Unreachable => ServerStatus::Offline,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ServerStatus::Starting => "🔄",
            ServerStatus::Online => "⚡",
            ServerStatus::Offline => "🔴",
            ServerStatus::Error => "⚠️",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServerStatus::Starting => "Starting",
            ServerStatus::Online => "Online",
            ServerStatus::Offline => "Offline",
            ServerStatus::Error => "Error",
        }
    }

    pub fn colored_label(self) -> ColoredString {
        match self {
            ServerStatus::Starting => self.label().cyan(),
            ServerStatus::Online => self.label().green().bold(),
            ServerStatus::Offline => self.label().red().bold(),
            ServerStatus::Error => self.label().yellow().bold(),
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
