//! Crawl snapshot persistence.
//!
//! Serializes fetched pages to a JSON file so the crawl and index
//! stages can run in separate invocations. The snapshot is the
//! hand-off format between `siterag crawl` and `siterag process`.

use std::fs;
use std::path::Path;

use crate::core::error::{Result, SiteragError};
use crate::core::types::Page;

/// Write pages as pretty-printed JSON to `path`.
pub fn save_pages(path: &Path, pages: &[Page]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(pages)?;
    fs::write(path, json)?;
    tracing::info!("Saved {} pages to {}", pages.len(), path.display());
    Ok(())
}

/// Load pages from a snapshot written by [`save_pages`].
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let json = fs::read_to_string(path).map_err(|e| {
        SiteragError::Snapshot(format!("Cannot read {}: {e}", path.display()))
    })?;
    let pages: Vec<Page> = serde_json::from_str(&json).map_err(|e| {
        SiteragError::Snapshot(format!("Malformed snapshot {}: {e}", path.display()))
    })?;
    Ok(pages)
}
