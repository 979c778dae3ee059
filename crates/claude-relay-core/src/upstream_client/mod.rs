use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use claude_relay_common::RelayConfig;
use wreq::{Client, Method, Proxy};

use crate::headers::Headers;

/// A single POST to the upstream messages endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for UpstreamTransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpstreamTransportErrorKind::Timeout => "timeout",
            UpstreamTransportErrorKind::Connect => "connect",
            UpstreamTransportErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// The upstream could not be reached or did not answer in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub kind: UpstreamTransportErrorKind,
    pub message: String,
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl UpstreamClientConfig {
    pub fn from_relay(config: &RelayConfig) -> Self {
        Self {
            proxy: config.proxy.clone(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// Pooled `wreq` client shared by every request.
#[derive(Clone)]
pub struct WreqUpstreamClient {
    client: Client,
}

impl WreqUpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, wreq::Error> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);

        if let Some(proxy) = normalize_proxy(config.proxy) {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

fn normalize_proxy(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut builder = self.client.request(Method::POST, &req.url);
            for (k, v) in &req.headers {
                builder = builder.header(k, v);
            }
            builder = builder.body(req.body);

            let resp = builder.send().await.map_err(map_wreq_error)?;
            let status = resp.status().as_u16();
            let headers = headers_from_wreq(resp.headers());
            let body = resp.bytes().await.map_err(map_wreq_error)?;
            Ok(UpstreamHttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn headers_from_wreq(map: &wreq::header::HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
        .collect()
}

fn map_wreq_error(err: wreq::Error) -> UpstreamFailure {
    let kind = if err.is_timeout() {
        UpstreamTransportErrorKind::Timeout
    } else if err.is_connect() || err.is_connection_reset() {
        UpstreamTransportErrorKind::Connect
    } else {
        UpstreamTransportErrorKind::Other
    };
    UpstreamFailure {
        kind,
        message: err.to_string(),
    }
}
