// Framework bootstrap for the track server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{EngineSettings, spawn_engines};

use axum::{Router, routing::get};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::{io::Result, sync::Arc};
use tower_http::services::{ServeDir, ServeFile};

/// Everything `run` needs besides the listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub public_dir: PathBuf,
    pub engine: EngineSettings,
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// WebSocket subscriptions on `/a`; every other path is a static viewer asset.
pub fn router(state: Arc<AppState>, public_dir: &Path) -> Router {
    let assets = ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html")));

    Router::new()
        .route("/a", get(ws_handler))
        .fallback_service(assets)
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener, config: ServerConfig) -> Result<()> {
    let address = listener.local_addr()?;

    // Start the clock -> simulator -> state engine pipeline before accepting viewers.
    let engines = spawn_engines(config.engine, StdRng::from_entropy())
        .map_err(|e| std::io::Error::other(format!("invalid simulation settings: {e}")))?;
    tracing::debug!(
        tick_interval_ms = config.engine.tick_interval.as_millis(),
        max_tracks = config.engine.simulation.max_tracks,
        speed_limit = config.engine.simulation.speed_limit,
        "engines started"
    );

    let state = Arc::new(AppState {
        engine: engines.state.clone(),
        ping_period: config::PING_PERIOD,
    });
    let app = router(state, &config.public_dir);

    tracing::info!(%address, public_dir = %config.public_dir.display(), "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let args = config::Args::parse();
    let engine = config::engine_settings()
        .map_err(|e| std::io::Error::other(format!("invalid configuration: {e}")))
        .inspect_err(|e| {
            tracing::error!(error = %e, "failed to load configuration");
        })?;

    let address = SocketAddr::from(([127, 0, 0, 1], args.http_port));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(
        listener,
        ServerConfig {
            public_dir: args.public_dir,
            engine,
        },
    )
    .await
}
