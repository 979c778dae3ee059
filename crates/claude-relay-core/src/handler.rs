use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::CoreState;
use crate::error::RelayError;
use crate::payload::InboundRequest;

pub const REQUEST_ID_HEADER: &str = "x-relay-request-id";

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health_handler() -> Json<HealthStatus> {
    // Rfc3339 only fails for years outside 0..=9999.
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("current UTC time formats as RFC 3339");
    Json(HealthStatus {
        status: "ok",
        timestamp,
    })
}

pub async fn analyze_handler(State(state): State<Arc<CoreState>>, body: Bytes) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();

    let inbound = match InboundRequest::from_slice(&body) {
        Ok(inbound) => inbound,
        Err(err) => {
            let err = RelayError::InvalidBody(err.to_string());
            warn!(
                event = "downstream_responded",
                trace_id = %trace_id,
                status = %err.status().as_u16(),
                error = %err,
                elapsed_ms = started_at.elapsed().as_millis()
            );
            return with_trace_id(err.into_response(), &trace_id);
        }
    };

    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        model = ?inbound.model,
        max_tokens = ?inbound.max_tokens,
        body_bytes = body.len()
    );

    match state.relay.forward(inbound).await {
        Ok(resp) => {
            info!(
                event = "downstream_responded",
                trace_id = %trace_id,
                status = %resp.status.as_u16(),
                upstream_request_id = ?resp.upstream_request_id,
                elapsed_ms = started_at.elapsed().as_millis()
            );
            with_trace_id((resp.status, Json(resp.body)).into_response(), &trace_id)
        }
        Err(err) => {
            log_failure(&trace_id, &err, started_at);
            with_trace_id(err.into_response(), &trace_id)
        }
    }
}

fn log_failure(trace_id: &str, err: &RelayError, started_at: Instant) {
    let status = err.status().as_u16();
    let elapsed_ms = started_at.elapsed().as_millis();
    match err {
        RelayError::UpstreamRejected { .. } | RelayError::InvalidBody(_) => warn!(
            event = "downstream_responded",
            trace_id = %trace_id,
            status = %status,
            error = %err,
            elapsed_ms = elapsed_ms
        ),
        RelayError::MissingApiKey | RelayError::Transport(_) | RelayError::Fault(_) => error!(
            event = "downstream_responded",
            trace_id = %trace_id,
            status = %status,
            error = %err,
            transport = ?err.transport_kind(),
            elapsed_ms = elapsed_ms
        ),
    }
}

fn with_trace_id(mut resp: Response, trace_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}
