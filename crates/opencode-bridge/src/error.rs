use crate::types::ErrorBody;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("opencode invocation failed: {0}")]
    Upstream(String),

    #[error("opencode did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl BridgeError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        BridgeError::InvalidRequest(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        BridgeError::Upstream(msg.into())
    }

    /// OpenAI `error.type` value for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::InvalidRequest(_) => "invalid_request_error",
            BridgeError::Upstream(_) => "upstream_error",
            BridgeError::Timeout(_) => "timeout_error",
        }
    }
}

impl ResponseError for BridgeError {
    fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Upstream(_) => StatusCode::BAD_GATEWAY,
            BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string(), self.kind()))
    }
}
