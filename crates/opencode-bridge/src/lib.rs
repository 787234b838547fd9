//! OpenCode Bridge - OpenAI-compatible chat completions on top of the `opencode` CLI.
//!
//! OpenAI clients speak `/v1/chat/completions`. This crate exposes that HTTP
//! surface, but answers every request by running `opencode --model <model> run -`
//! as a subprocess and reshaping its stdout.
//!
//! Design goals:
//! - Accept OpenAI chat-completion traffic, ignoring sampling knobs the CLI can't honor.
//! - Flatten the message list into a single prompt (see [`translation`]).
//! - Emulate SSE streaming by slicing the finished reply (see [`streaming`]).
//! - Surface slow and broken invocations as distinct HTTP errors.

pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod request_log;
pub mod server;
pub mod streaming;
pub mod translation;
pub mod types;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use executor::{Assistant, OpenCodeExecutor};
pub use server::serve;
