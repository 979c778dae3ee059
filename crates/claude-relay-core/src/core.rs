use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use claude_relay_common::RelayConfig;
use tower_http::cors::{Any, CorsLayer};

use crate::handler::{analyze_handler, health_handler};
use crate::relay::Relay;
use crate::upstream_client::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};

pub struct CoreState {
    pub relay: Relay,
}

pub struct Core {
    state: Arc<CoreState>,
    max_body_bytes: usize,
}

impl Core {
    pub fn new(config: RelayConfig, client: Arc<dyn UpstreamClient>) -> Self {
        let max_body_bytes = config.max_body_bytes;
        Self {
            state: Arc::new(CoreState {
                relay: Relay::new(Arc::new(config), client),
            }),
            max_body_bytes,
        }
    }

    /// Builds the core with a pooled `wreq` client configured from `config`.
    pub fn from_config(config: RelayConfig) -> Result<Self, wreq::Error> {
        let client = WreqUpstreamClient::new(UpstreamClientConfig::from_relay(&config))?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/analyze", post(analyze_handler))
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }
}
