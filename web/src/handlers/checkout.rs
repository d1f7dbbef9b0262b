//! Checkout endpoint.
//!
//! - POST /checkout - Open an embedded payment session for one or more artworks

use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;
use atelier_core::types::ReservationRequest;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to start a checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Cart lines as the browser sees them. Accepted for compatibility and
    /// ignored: prices and titles are read from the catalog.
    #[serde(default)]
    pub line_items: Vec<Value>,
    /// Buyer email
    #[serde(default)]
    pub buyer_email: String,
    /// Buyer display name
    #[serde(default)]
    pub buyer_name: String,
    /// Artworks to buy
    #[serde(default)]
    pub item_ids: Vec<String>,
}

/// Response after opening a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Secret for mounting the embedded checkout
    pub client_secret: String,
}

/// Start a checkout.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/checkout \
///   -H "Content-Type: application/json" \
///   -d '{"buyerEmail": "a@b.com", "buyerName": "Ada", "itemIds": ["blue-frog"]}'
/// # {"clientSecret":"cs_test_..._secret_..."}
/// ```
///
/// # Errors
///
/// - 422 for invalid input
/// - 404 for an unknown artwork
/// - 409 if an artwork is already sold
/// - 502 if the payment provider fails
/// - 503 if the catalog cannot be read
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    if !request.line_items.is_empty() {
        tracing::debug!(
            lines = request.line_items.len(),
            "Ignoring client-supplied line items, pricing from catalog"
        );
    }

    let reservation =
        ReservationRequest::new(request.item_ids, request.buyer_email, request.buyer_name);

    match state.coordinator.begin_checkout(&reservation).await {
        Ok(started) => {
            metrics::record_checkout_started();
            Ok(Json(CheckoutResponse {
                client_secret: started.client_secret,
            }))
        }
        Err(e) => {
            metrics::record_checkout_failed(&e);
            Err(e.into())
        }
    }
}
