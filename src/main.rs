mod api;
mod catalog;
mod config;
mod gemini;
mod sheets;
mod translit;

pub const USER_AGENT: &str = concat!("doritop/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

use api::AppState;
use catalog::{Loader, SearchEngine, SnapshotStore};
use config::Config;
use gemini::{EnrichmentProxy, GeminiClient};
use sheets::SheetsClient;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("doritop=info".parse()?),
        )
        .init();

    let config = Config::parse();

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let sheets = SheetsClient::new(http.clone(), &config.credentials, &config.sheet_name);
    let catalog = SearchEngine::new(
        Arc::new(SnapshotStore::new()),
        Loader::new(sheets, config.columns()),
        config.cache_ttl(),
    );
    let gemini = GeminiClient::from_env(http)
        .inspect_err(|e| warn!("Gemini client not available: {e}"))
        .ok();

    if let Err(e) = catalog.refresh().await {
        info!("starting without catalog ({e}); first search will retry");
    }

    let state = Arc::new(AppState {
        catalog,
        enrichment: EnrichmentProxy::new(gemini),
    });
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .inspect_err(|e| tracing::error!("failed to bind {}: {e}", config.listen_addr()))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
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
                warn!("failed to listen for SIGTERM: {e}");
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
}
