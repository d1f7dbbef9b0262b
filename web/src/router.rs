//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints and the HTTP layers
//! around them.

use crate::handlers::{artworks, checkout, health, session_status};
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Every request gets an `x-request-id` (kept if the client sent one) that is
/// recorded by the trace layer and echoed on the response.
///
/// # Arguments
///
/// - `state`: Application state to share with handlers
/// - `cors_allowed_origins`: Browser origins allowed to call the API; empty
///   allows any origin
pub fn build_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        // Checkout and reconciliation
        .route("/checkout", post(checkout::create_checkout))
        .route("/session-status", get(session_status::session_status))
        // Catalog
        .route("/artworks", get(artworks::list_artworks))
        .route("/artworks/:id", get(artworks::get_artwork))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(cors_allowed_origins)),
        )
        .with_state(state)
}

/// CORS for the storefront.
#[must_use]
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
