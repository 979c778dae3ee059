use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u64 = 4000;
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayConfigError {
    #[error("upstream base url must start with http:// or https://: {0}")]
    InvalidUpstreamBaseUrl(String),
    #[error("config field must be greater than zero: {0}")]
    Zero(&'static str),
}

/// Final, merged configuration used by the running process.
///
/// Precedence: CLI > ENV > defaults. Built once at startup and shared
/// read-only by every request.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Upstream credential. `None` is reported per request, not at startup.
    pub api_key: Option<String>,
    pub upstream_base_url: String,
    pub default_model: String,
    pub anthropic_version: String,
    pub max_body_bytes: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full URL of the upstream messages endpoint.
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.upstream_base_url.trim_end_matches('/'))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            proxy: None,
        }
    }
}

// The credential never reaches the logs, not even through `{:?}`.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("upstream_base_url", &self.upstream_base_url)
            .field("default_model", &self.default_model)
            .field("anthropic_version", &self.anthropic_version)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Raw values collected from the CLI and environment, before defaults and
/// validation are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub upstream_base_url: Option<String>,
    pub default_model: Option<String>,
    pub anthropic_version: Option<String>,
    pub max_body_bytes: Option<usize>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub proxy: Option<String>,
}

impl RelayConfigPatch {
    pub fn into_config(self) -> Result<RelayConfig, RelayConfigError> {
        let upstream_base_url = non_empty(self.upstream_base_url)
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());
        if !(upstream_base_url.starts_with("http://") || upstream_base_url.starts_with("https://"))
        {
            return Err(RelayConfigError::InvalidUpstreamBaseUrl(upstream_base_url));
        }

        let max_body_bytes = self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(RelayConfigError::Zero("max_body_bytes"));
        }
        let connect_timeout_secs = self
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        if connect_timeout_secs == 0 {
            return Err(RelayConfigError::Zero("connect_timeout_secs"));
        }
        let request_timeout_secs = self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(RelayConfigError::Zero("request_timeout_secs"));
        }

        Ok(RelayConfig {
            host: non_empty(self.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            api_key: non_empty(self.api_key),
            upstream_base_url,
            default_model: non_empty(self.default_model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            anthropic_version: non_empty(self.anthropic_version)
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_VERSION.to_string()),
            max_body_bytes,
            connect_timeout_secs,
            request_timeout_secs,
            proxy: non_empty(self.proxy),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}
