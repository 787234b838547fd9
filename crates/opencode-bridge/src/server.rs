//! Actix Web HTTP server.
//!
//! Exposes OpenAI-compatible endpoints:
//! - `POST /v1/chat/completions`
//! - `GET /v1/models`
//! - `GET /health`

use crate::{
    config::BridgeConfig,
    error::BridgeError,
    executor::{Assistant, OpenCodeExecutor},
    models,
    request_log::{LogEvent, RequestLog},
    streaming, translation,
    types::{ChatCompletion, ChatCompletionRequest, HealthResponse},
};
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: BridgeConfig,
    pub assistant: Arc<dyn Assistant>,
    pub log: Arc<RequestLog>,
}

impl AppState {
    pub fn new(config: BridgeConfig, assistant: Arc<dyn Assistant>) -> Self {
        let log = Arc::new(RequestLog::new(config.request_log.clone()));
        Self {
            config,
            assistant,
            log,
        }
    }
}

pub async fn serve(config: BridgeConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;

    let addr = config.bind_addr();
    let executor = OpenCodeExecutor::new(&config);
    info!(
        program = %executor.program().display(),
        model = %executor.model(),
        timeout_secs = config.request_timeout_secs,
        "using opencode executable"
    );
    if let Some(path) = &config.request_log {
        info!(path = %path.display(), "appending requests to log");
    }

    let state = web::Data::new(AppState::new(config, Arc::new(executor)));

    info!(addr = %addr, "opencode-bridge listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(routes)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}

/// Route table shared by [`serve`] and the integration tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health_check))
        .route("/v1/models", web::get().to(list_models))
        .route("/v1/chat/completions", web::post().to(chat_completions));
}

/// Malformed bodies get the same OpenAI error envelope as other client errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(|err, _req| {
            BridgeError::invalid_request(format!("Invalid request body: {}", err)).into()
        })
}

fn completion_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &uuid[..8])
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn list_models(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(models::list_models(&state.config.model, now_unix()))
}

async fn chat_completions(
    state: web::Data<AppState>,
    body: web::Json<ChatCompletionRequest>,
) -> Result<HttpResponse, BridgeError> {
    let req = body.into_inner();
    let prompt = translation::build_prompt(&req.messages)?;

    let id = completion_id();
    let model = state.config.model.clone();
    let stream = req.is_streaming();

    debug!(
        %id,
        requested_model = %req.model,
        backing_model = %model,
        stream,
        messages = req.messages.len(),
        "chat completion request"
    );
    state
        .log
        .record(
            &id,
            LogEvent::Request {
                requested_model: &req.model,
                stream,
                messages: req.messages.len(),
                prompt: &prompt,
            },
        )
        .await;

    // Runs to completion before any response bytes are sent, so a failure
    // never leaves a half-open event stream behind.
    let content = match state.assistant.complete(&prompt).await {
        Ok(content) => content,
        Err(e) => {
            error!(%id, error = %e, "opencode invocation failed");
            state
                .log
                .record(
                    &id,
                    LogEvent::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                )
                .await;
            return Err(e);
        }
    };

    state
        .log
        .record(&id, LogEvent::Response { content: &content })
        .await;
    info!(%id, stream, reply_chars = content.chars().count(), "chat completion finished");

    let created = now_unix();

    if stream {
        let frames = streaming::completion_stream(
            id,
            model,
            created,
            content,
            state.config.stream_settings(),
        )
        .map(|frame| Ok::<_, actix_web::Error>(web::Bytes::from(frame)));

        return Ok(HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(frames));
    }

    Ok(HttpResponse::Ok().json(ChatCompletion::new(&id, &model, content, created)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_id_format() {
        let id = completion_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_eq!(id.len(), "chatcmpl-".len() + 8);
        assert!(id["chatcmpl-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(completion_id(), completion_id());
    }
}
