mod error;
mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use state::{AppState, SharedState};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use treegrant_core::config::DEFAULT_CONFIG_PATH;
use treegrant_core::Config;

#[derive(Parser)]
#[command(name = "treegrant-service")]
#[command(about = "HTTP service for tree grants and child listings", long_about = None)]
struct Args {
    /// Config file path
    #[arg(long, env = "TREEGRANT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    bind: Option<String>,
}

fn app(state: SharedState) -> Router {
    Router::new()
        .route("/list_files", post(routes::list_files))
        .route("/grants", get(routes::grants))
        .route("/grants/revoke", post(routes::revoke_grant))
        .route("/status", get(routes::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(config = %args.config.display(), error = %err, "failed to load config");
            std::process::exit(1);
        }
    };

    let state: SharedState = Arc::new(AppState::from_config(&config));
    let addr = format!(
        "{}:{}",
        args.bind.unwrap_or_else(|| config.service.bind.clone()),
        args.port.unwrap_or(config.service.port)
    );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, providers = ?state.authorities, "treegrant-service listening");

    if let Err(err) = axum::serve(listener, app(state)).await {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}
