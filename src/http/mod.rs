//! HTTP REST adapter
//!
//! Depends only on core/. Exposes the query API via Axum: health
//! check, query, and index statistics.

pub mod handlers;
pub mod middleware;

pub use handlers::*;
