//! siterag HTTP server entry point
//!
//! Starts the REST query API. On startup, builds the index from a
//! configured page snapshot when one is present, otherwise tries to
//! restore from the vector store so an existing collection can be
//! queried without re-crawling.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siterag::core::config::Config;
use siterag::core::services::Services;
use siterag::core::snapshot::load_pages;
use siterag::http::{self, middleware as http_middleware};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siterag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting siterag service");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    config.log_config();

    // Create shared services
    let services = Arc::new(Services::new(config.clone())?);

    // Build or restore the index so queries can be served
    if let Some(path) = &config.server.snapshot_path {
        let pages = load_pages(path)?;
        let stats = services.indexes.rebuild(&pages).await?;
        tracing::info!(
            "Indexed {} chunks from snapshot {}",
            stats.chunks_indexed,
            path.display()
        );
    } else {
        match services.indexes.restore().await {
            Ok(stats) => {
                tracing::info!("Restored {} chunks from vector store", stats.chunks_indexed)
            }
            Err(e) => tracing::warn!(
                "No index available yet ({e}); queries will return 503 until one is built"
            ),
        }
    }

    // Build the API router
    let app = Router::new()
        .route("/health", get(http::health_handler))
        .route("/query", post(http::query_handler))
        .route("/stats", get(http::stats_handler))
        .layer(middleware::from_fn(http_middleware::log_request))
        .layer(CorsLayer::permissive())
        .with_state(services);

    // Bind to address and start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("Service ready - Health check at http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
