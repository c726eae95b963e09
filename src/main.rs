//! Ingress autoswagger — one Swagger UI page for every service behind an ingress.
//!
//! Probes the configured services (or explicit OpenAPI URLs) for API docs,
//! keeps the reachable ones in memory and serves them as a single landing
//! page on port 3000. The list is rebuilt on startup, on the refresh
//! schedule and whenever `/refresh` is hit.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

mod cache;
mod config;
mod discovery;
mod schedule;
mod server;

use cache::ServiceCache;
use config::{Args, Config, LogFormat};
use discovery::prober::HttpProber;
use discovery::refresh::Refresher;
use discovery::resolver::DocPaths;
use server::{AppState, TemplateSource};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!("📚 Ingress autoswagger v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };
    config.log_summary();

    // ── Discovery ───────────────────────────────────────────────────
    let prober = Arc::new(HttpProber::new(config.probe_timeout)?);
    let refresher = Arc::new(Refresher::new(
        config.targets.clone(),
        DocPaths::from_config(&config),
        prober,
        ServiceCache::new(),
    ));
    let poller = discovery::poller::spawn_poller(Arc::clone(&refresher), config.schedule.clone());

    // ── HTTP Server ─────────────────────────────────────────────────
    let template = match &config.template_path {
        Some(path) => {
            info!(path = %path.display(), "Using page template from file");
            TemplateSource::File(path.clone())
        }
        None => TemplateSource::Builtin,
    };
    let state = AppState::new(refresher, template);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let served = server::serve(addr, state, shutdown_signal()).await;
    poller.stop().await;
    served
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "autoswagger=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
