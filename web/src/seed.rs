//! Startup catalog import.
//!
//! Reads a JSON array of legacy artwork records and upserts them into the
//! content store. Upserts never un-sell, so re-running the import against a
//! live catalog is safe.

use atelier_core::catalog::LegacyArtwork;
use atelier_core::error::StoreError;
use atelier_core::store::ContentStore;
use atelier_core::types::Item;
use std::path::Path;
use thiserror::Error;

/// Errors raised while importing a catalog.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// I/O error
        source: std::io::Error,
    },

    /// The file is not a JSON array of artworks.
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// An item could not be written.
    #[error("failed to store {item_id}: {source}")]
    Store {
        /// Item being written
        item_id: String,
        /// Store error
        source: StoreError,
    },
}

/// Parse a legacy catalog export into items.
///
/// # Errors
///
/// Returns `SeedError::Parse` if `json` is not an array of artwork records.
pub fn parse_catalog(json: &str) -> Result<Vec<Item>, SeedError> {
    let records: Vec<LegacyArtwork> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(LegacyArtwork::into_item).collect())
}

/// Upsert every item from the catalog file at `path`.
///
/// Returns the number of items written.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, or an upsert fails.
pub async fn seed_catalog(store: &dyn ContentStore, path: &Path) -> Result<usize, SeedError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let items = parse_catalog(&json)?;
    let count = items.len();

    for item in items {
        let item_id = item.id.to_string();
        store
            .upsert(item)
            .await
            .map_err(|source| SeedError::Store { item_id, source })?;
    }

    tracing::info!(path = %path.display(), count, "Catalog seeded");
    Ok(count)
}
