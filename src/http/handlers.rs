//! HTTP request handlers for the siterag API
//!
//! Implements handlers for the 3 REST endpoints: health, query, and
//! index statistics.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::core::error::SiteragError;
use crate::core::services::Services;
use crate::core::types::*;

/// Health check handler
///
/// Returns server status and version information.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Query handler
///
/// Answers a question against the current index snapshot using the
/// requested retrieval mode (hybrid when omitted).
///
/// # Errors
///
/// - `InvalidQuery`: Empty question or out-of-range min_score
/// - `IndexNotBuilt`: No index build has completed yet (503)
/// - `EmbeddingUnavailable` / `StorageUnavailable`: Backend down (502)
pub async fn query_handler(
    State(services): State<Arc<Services>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Answer>, SiteragError> {
    let mode = req.mode.unwrap_or(RetrievalMode::Hybrid);
    let answer = services
        .retriever
        .answer(&req.question, mode, req.top_k, req.min_score)
        .await?;
    Ok(Json(answer))
}

/// Index statistics handler
///
/// Reports the current snapshot version and chunk count; both are
/// absent/zero before the first build.
pub async fn stats_handler(State(services): State<Arc<Services>>) -> Json<StatsResponse> {
    let (snapshot_version, chunks) = match services.indexes.snapshot() {
        Ok(snapshot) => (Some(snapshot.version), snapshot.chunk_count()),
        Err(_) => (None, 0),
    };
    Json(StatsResponse {
        snapshot_version,
        chunks,
    })
}
