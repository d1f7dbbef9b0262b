//! Catalog read endpoints.
//!
//! - GET /artworks - List artworks, optionally filtered
//! - GET /artworks/:id - Get one artwork

use crate::error::AppError;
use crate::state::AppState;
use atelier_core::catalog::{Availability, CatalogFilter};
use atelier_core::types::{Item, ItemId};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing artworks. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListArtworksQuery {
    /// Medium, e.g. `Acrylic on Canvas`
    pub medium: Option<String>,
    /// Dimensions, e.g. `24x36`
    pub size: Option<String>,
    /// `sold` or `available`
    pub availability: Option<String>,
}

impl ListArtworksQuery {
    fn into_filter(self) -> Result<CatalogFilter, AppError> {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let availability = non_blank(self.availability)
            .map(|value| value.parse::<Availability>())
            .transpose()
            .map_err(|e| AppError::bad_request(e.to_string()))?;

        Ok(CatalogFilter {
            medium: non_blank(self.medium),
            size: non_blank(self.size),
            availability,
        })
    }
}

/// Public view of an artwork. Buyer details stay private.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkResponse {
    /// Artwork id
    pub id: ItemId,
    /// Title
    pub title: String,
    /// Price in minor units
    pub price_minor_units: i64,
    /// Currency code
    pub currency: String,
    /// Medium
    pub medium: Option<String>,
    /// Dimensions
    pub dimensions: Option<String>,
    /// Year
    pub year: Option<String>,
    /// Image URLs
    pub image_urls: Vec<String>,
    /// Whether it has been sold
    pub sold: bool,
}

impl From<Item> for ArtworkResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            price_minor_units: item.price_minor_units,
            currency: item.currency.code().to_string(),
            medium: item.medium,
            dimensions: item.dimensions,
            year: item.year,
            image_urls: item.image_urls,
            sold: item.sold,
        }
    }
}

/// Response for listing artworks.
#[derive(Debug, Serialize)]
pub struct ListArtworksResponse {
    /// Matching artworks, ordered by title
    pub artworks: Vec<ArtworkResponse>,
    /// Number of matches
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List artworks.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/artworks?medium=acrylic%20on%20canvas&availability=available"
/// ```
///
/// # Errors
///
/// - 400 for an unknown availability value
/// - 503 if the catalog cannot be read
pub async fn list_artworks(
    State(state): State<AppState>,
    Query(query): Query<ListArtworksQuery>,
) -> Result<Json<ListArtworksResponse>, AppError> {
    let filter = query.into_filter()?;
    let items = state.store.list(&filter).await.map_err(store_unavailable)?;

    let artworks: Vec<ArtworkResponse> = items.into_iter().map(ArtworkResponse::from).collect();
    Ok(Json(ListArtworksResponse {
        total: artworks.len(),
        artworks,
    }))
}

/// Get one artwork.
///
/// # Errors
///
/// - 404 if no artwork has this id
/// - 503 if the catalog cannot be read
pub async fn get_artwork(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ArtworkResponse>, AppError> {
    let item_id = ItemId::new(id);
    let item = state
        .store
        .get(&item_id)
        .await
        .map_err(store_unavailable)?
        .ok_or_else(|| AppError::not_found("Artwork", &item_id))?;

    Ok(Json(item.into()))
}

fn store_unavailable(err: atelier_core::error::StoreError) -> AppError {
    AppError::unavailable("The catalog is temporarily unavailable").with_source(err.into())
}
