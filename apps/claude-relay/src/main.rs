use std::error::Error;

use clap::Parser;
use claude_relay_core::Core;
use tracing::{info, warn};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("claude-relay failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = cli.into_patch().into_config()?;
    info!(
        host = %config.host,
        port = config.port,
        upstream = %config.messages_url(),
        default_model = %config.default_model,
        max_body_bytes = config.max_body_bytes,
        request_timeout_secs = config.request_timeout_secs,
        proxy = %config.proxy.as_deref().unwrap_or(""),
        api_key_configured = config.has_api_key(),
        "config loaded"
    );
    if !config.has_api_key() {
        warn!("CLAUDE_API_KEY not configured; /api/analyze will answer 500 until restarted with it");
    }

    let bind = config.bind_addr();
    let core = Core::from_config(config)?;
    let app = core.router();

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("claude_relay=info,claude_relay_core=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
