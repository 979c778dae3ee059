//! Request forwarding for claude-relay.
//!
//! `Relay` owns the forwarding contract (defaults, credential injection,
//! status passthrough, error envelopes) and talks to the upstream only through
//! the `UpstreamClient` trait. `Core` wires it into an axum router.

pub mod core;
pub mod error;
pub mod handler;
pub mod headers;
pub mod payload;
pub mod relay;
pub mod upstream_client;

pub use crate::core::{Core, CoreState};
pub use error::{ErrorEnvelope, RelayError};
pub use payload::{InboundRequest, UpstreamMessagesBody};
pub use relay::{Relay, RelayResponse};
pub use upstream_client::{
    UpstreamClient, UpstreamClientConfig, UpstreamFailure, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamTransportErrorKind, WreqUpstreamClient,
};
