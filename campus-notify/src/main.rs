//! campus-notify - Notification feed aggregation service
//!
//! Polls the school backend's notice/exam/result endpoints for one viewer,
//! runs the normalize/dedupe/filter/group pipeline, and serves the result
//! over a small HTTP surface with SSE change notifications.

use anyhow::Result;
use campus_common::config::{CliOverrides, NotifyConfig};
use campus_notify::{build_router, poller, AppState};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "campus-notify", about = "Campus notification feed service")]
struct Args {
    /// Backend REST API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Bind address for the service HTTP surface (host:port)
    #[arg(long)]
    bind: Option<String>,

    /// Seconds between periodic feed refreshes
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Campus Notification Feed (campus-notify) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = NotifyConfig::resolve(CliOverrides {
        api_base_url: args.api_url,
        bind: args.bind,
        poll_interval_secs: args.poll_secs,
        config_file: args.config,
    });
    info!(
        api = %config.api_base_url,
        role = %config.viewer_role,
        poll_secs = config.poll_interval_secs,
        "configuration resolved"
    );

    let state = AppState::new(config);

    // Prime the feed before accepting requests, then keep it fresh
    poller::refresh_cycle(&state).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_handle = tokio::spawn(poller::run(state.clone(), shutdown_rx));

    let bind = state.config.bind.clone();
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("campus-notify listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = poll_handle.await;

    Ok(())
}
