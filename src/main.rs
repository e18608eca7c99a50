use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wiremock_metrics::metrics::Registries;
use wiremock_metrics::server::{self, ADMIN_PREFIX};
use wiremock_metrics::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "wiremock-metrics")]
#[command(about = "Stub HTTP server with Prometheus latency metrics")]
struct Args {
    /// Path to the JSON settings file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the settings file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("wiremock_metrics=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // ── 1. Load settings ─────────────────────────────────────────
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(bind) = args.bind {
        settings.bind = bind;
    }

    // ── 2. Build shared state ────────────────────────────────────
    let registries = Registries::new();
    let state = server::build_state(&settings, &registries)
        .context("failed to initialise metrics")?;
    info!(
        mappings = state.stubs.len(),
        label_source = ?state.recorder.configuration().label_source(),
        "metrics recorder ready"
    );

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;

    info!("stub server listening on http://{}", settings.bind);
    info!("scrape endpoint → http://{}{ADMIN_PREFIX}/prometheus-metrics", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    // ── 5. Detach so a restart in-process finds one target again ─
    registries.clear();
    info!("metrics registry detached");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
