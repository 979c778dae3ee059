use std::sync::Arc;

use bytes::Bytes;
use claude_relay_common::RelayConfig;
use http::StatusCode;
use serde_json::Value;

use crate::error::{RelayError, UPSTREAM_FAILED};
use crate::headers::{Headers, header_get, header_set};
use crate::payload::{InboundRequest, UpstreamMessagesBody};
use crate::upstream_client::{UpstreamClient, UpstreamHttpRequest};

/// Upstream answer relayed back to the caller on the success path.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Value,
    /// `request-id` reported by the upstream, when present.
    pub upstream_request_id: Option<String>,
}

pub struct Relay {
    config: Arc<RelayConfig>,
    client: Arc<dyn UpstreamClient>,
}

impl Relay {
    pub fn new(config: Arc<RelayConfig>, client: Arc<dyn UpstreamClient>) -> Self {
        Self { config, client }
    }

    pub fn build_upstream_request(
        &self,
        api_key: &str,
        body: &UpstreamMessagesBody,
    ) -> Result<UpstreamHttpRequest, RelayError> {
        let body =
            serde_json::to_vec(body).map_err(|err| RelayError::Fault(err.to_string()))?;
        let mut headers = Headers::new();
        header_set(&mut headers, "content-type", "application/json");
        header_set(&mut headers, "x-api-key", api_key);
        header_set(
            &mut headers,
            "anthropic-version",
            self.config.anthropic_version.as_str(),
        );
        Ok(UpstreamHttpRequest {
            url: self.config.messages_url(),
            headers,
            body: Bytes::from(body),
        })
    }

    /// Forwards one inbound request. Makes at most one upstream call and
    /// none at all when no credential is configured.
    pub async fn forward(&self, inbound: InboundRequest) -> Result<RelayResponse, RelayError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(RelayError::MissingApiKey);
        };

        let body = inbound.into_upstream(&self.config.default_model);
        let req = self.build_upstream_request(api_key, &body)?;
        let resp = self.client.send(req).await?;

        let status = StatusCode::from_u16(resp.status)
            .map_err(|err| RelayError::Fault(err.to_string()))?;
        let upstream_request_id = header_get(&resp.headers, "request-id").map(str::to_string);
        let payload: Value = serde_json::from_slice(&resp.body)
            .map_err(|err| RelayError::Fault(err.to_string()))?;

        if !status.is_success() {
            let message = upstream_error_message(&payload)
                .unwrap_or(UPSTREAM_FAILED)
                .to_string();
            return Err(RelayError::UpstreamRejected {
                status,
                message,
                body: payload,
            });
        }

        Ok(RelayResponse {
            status,
            body: payload,
            upstream_request_id,
        })
    }
}

fn upstream_error_message(payload: &Value) -> Option<&str> {
    payload
        .get("error")?
        .get("message")?
        .as_str()
        .filter(|message| !message.is_empty())
}
