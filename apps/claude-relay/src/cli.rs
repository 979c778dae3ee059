use clap::Parser;
use claude_relay_common::RelayConfigPatch;

#[derive(Parser)]
#[command(name = "claude-relay", about = "Forward JSON requests to the Claude Messages API")]
pub(crate) struct Cli {
    #[arg(long, env = "HOST")]
    pub(crate) host: Option<String>,
    #[arg(long, env = "PORT")]
    pub(crate) port: Option<u16>,
    #[arg(long, env = "CLAUDE_API_KEY", hide_env_values = true)]
    pub(crate) api_key: Option<String>,
    #[arg(long, env = "CLAUDE_API_BASE_URL")]
    pub(crate) upstream_base_url: Option<String>,
    #[arg(long, env = "CLAUDE_DEFAULT_MODEL")]
    pub(crate) default_model: Option<String>,
    #[arg(long, env = "ANTHROPIC_VERSION")]
    pub(crate) anthropic_version: Option<String>,
    #[arg(long, env = "RELAY_MAX_BODY_BYTES")]
    pub(crate) max_body_bytes: Option<usize>,
    #[arg(long, env = "RELAY_CONNECT_TIMEOUT_SECS")]
    pub(crate) connect_timeout_secs: Option<u64>,
    #[arg(long, env = "RELAY_REQUEST_TIMEOUT_SECS")]
    pub(crate) request_timeout_secs: Option<u64>,
    #[arg(long, env = "RELAY_PROXY")]
    pub(crate) proxy: Option<String>,
}

impl Cli {
    pub(crate) fn into_patch(self) -> RelayConfigPatch {
        RelayConfigPatch {
            host: self.host,
            port: self.port,
            api_key: self.api_key,
            upstream_base_url: self.upstream_base_url,
            default_model: self.default_model,
            anthropic_version: self.anthropic_version,
            max_body_bytes: self.max_body_bytes,
            connect_timeout_secs: self.connect_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
            proxy: self.proxy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_patch_values() {
        let cli = Cli::try_parse_from([
            "claude-relay",
            "--port",
            "8080",
            "--api-key",
            "sk-cli",
            "--upstream-base-url",
            "http://127.0.0.1:9000",
        ])
        .unwrap();
        let config = cli.into_patch().into_config().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_key.as_deref(), Some("sk-cli"));
        assert_eq!(config.messages_url(), "http://127.0.0.1:9000/v1/messages");
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["claude-relay", "--port", "70000"]).is_err());
    }
}
