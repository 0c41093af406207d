//! songdl-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev),
//!    optionally mirrored to a daily log file.
//! 3. Prepare the download directory and the orchestrator.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use songdl_core::{Orchestrator, SpotDl};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Dropping the guard flushes the file writer; keep it for the whole run.
    let _log_guard = init_tracing(&cfg);

    info!(version = env!("CARGO_PKG_VERSION"), "songdl-server starting");

    // ── 3. Download directory + orchestrator ───────────────────────────────────
    tokio::fs::create_dir_all(&cfg.download_dir).await?;
    info!(dir = %cfg.download_dir.display(), "download directory ready");

    let converter = Arc::new(SpotDl::new(cfg.spotdl_settings()));
    let orchestrator = Arc::new(Orchestrator::new(cfg.orchestrator_settings(), converter));

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        orchestrator: Arc::clone(&orchestrator),
    });

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Artifacts still waiting for cleanup stay on disk.
    orchestrator.janitor().shutdown();

    info!("songdl-server stopped");
    Ok(())
}

/// Install the global subscriber. Returns the file writer guard when
/// `SONGDL_LOG_DIR` is set.
fn init_tracing(cfg: &Config) -> Option<WorkerGuard> {
    let directives = filter_directives(cfg);
    let env_filter = || EnvFilter::new(&directives);

    let stdout_layer = if cfg.log_json {
        fmt::layer().with_target(true).json().boxed()
    } else {
        fmt::layer().with_target(true).with_thread_ids(true).boxed()
    };

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "songdl-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .json()
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(env_filter()))
        .with(file_layer)
        .init();

    guard
}

/// `RUST_LOG` wins over `SONGDL_LOG`; an invalid `SONGDL_LOG` falls back to
/// `info` with a loud warning.
fn filter_directives(cfg: &Config) -> String {
    if let Ok(v) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if v.parse::<EnvFilter>().is_ok() {
            return v;
        }
    }
    match cfg.log_level.parse::<EnvFilter>() {
        Ok(_) => cfg.log_level.clone(),
        Err(e) => {
            eprintln!(
                "WARN: SONGDL_LOG='{}' is not a valid tracing filter ({}); \
                 falling back to 'info'",
                cfg.log_level, e
            );
            "info".to_owned()
        }
    }
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
