use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod app;
mod http;

/// Webhook-driven message board with live server-sent event updates.
#[derive(Debug, Parser)]
#[command(name = "herald-gateway", version)]
struct Cli {
    /// Path to the TOML config file (default: ./herald.toml).
    #[arg(long, env = "HERALD_CONFIG")]
    config: Option<String>,

    /// Listen port; overrides the config file and the PORT env var.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_gateway=info,herald_hub=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = herald_core::HeraldConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(state.clone());

    info!("Herald gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Herald gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then close every open event stream so the
/// server can drain.
async fn shutdown_signal(state: Arc<app::AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
    state.hub.shutdown();
}
