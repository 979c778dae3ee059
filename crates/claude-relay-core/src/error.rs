use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::upstream_client::{UpstreamFailure, UpstreamTransportErrorKind};

pub const MISSING_API_KEY: &str = "CLAUDE_API_KEY not configured";
pub const UPSTREAM_FAILED: &str = "Claude API request failed";
pub const PROXY_SERVER_ERROR: &str = "Proxy server error";
pub const INVALID_REQUEST_BODY: &str = "Invalid request body";

/// JSON body returned on every failure path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("CLAUDE_API_KEY not configured")]
    MissingApiKey,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    /// Non-2xx upstream answer with a JSON body.
    #[error("upstream returned {status}: {message}")]
    UpstreamRejected {
        status: StatusCode,
        message: String,
        body: Value,
    },
    #[error("upstream transport failure: {0}")]
    Transport(UpstreamFailure),
    /// Local fault while relaying, e.g. an upstream body that is not JSON.
    #[error("relay fault: {0}")]
    Fault(String),
}

impl From<UpstreamFailure> for RelayError {
    fn from(value: UpstreamFailure) -> Self {
        RelayError::Transport(value)
    }
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamRejected { status, .. } => *status,
            RelayError::MissingApiKey
            | RelayError::Transport(_)
            | RelayError::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn transport_kind(&self) -> Option<UpstreamTransportErrorKind> {
        match self {
            RelayError::Transport(failure) => Some(failure.kind),
            _ => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            RelayError::MissingApiKey => ErrorEnvelope {
                error: MISSING_API_KEY.to_string(),
                details: None,
                message: None,
            },
            RelayError::InvalidBody(message) => ErrorEnvelope {
                error: INVALID_REQUEST_BODY.to_string(),
                details: None,
                message: Some(message.clone()),
            },
            RelayError::UpstreamRejected { message, body, .. } => ErrorEnvelope {
                error: message.clone(),
                details: Some(body.clone()),
                message: None,
            },
            RelayError::Transport(failure) => ErrorEnvelope {
                error: PROXY_SERVER_ERROR.to_string(),
                details: None,
                message: Some(failure.message.clone()),
            },
            RelayError::Fault(message) => ErrorEnvelope {
                error: PROXY_SERVER_ERROR.to_string(),
                details: None,
                message: Some(message.clone()),
            },
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}
