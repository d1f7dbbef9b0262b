//! Session status endpoint.
//!
//! - GET /session-status?session_id=... - Verify a payment session and mark
//!   its artworks sold
//!
//! The success page polls this after the embedded checkout redirects back.
//! Every call re-verifies with the provider; repeated calls are safe.

use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;
use atelier_core::coordinator::{MarkingFailure, ReconciliationResult, ReconciliationState};
use atelier_core::types::{ItemId, PaymentIntentStatus, PaymentStatus, SessionId, SessionStatus};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

/// Query parameters for the status poll.
#[derive(Debug, Deserialize)]
pub struct SessionStatusQuery {
    /// Provider session id, as substituted into the return URL
    pub session_id: Option<String>,
}

/// Reconciliation outcome as the success page sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    /// Session status
    pub status: Option<SessionStatus>,
    /// Payment status
    pub payment_status: Option<PaymentStatus>,
    /// Payment intent status
    pub payment_intent_status: Option<PaymentIntentStatus>,
    /// Whether all three statuses agreed on a settled payment
    pub verified: bool,
    /// Reconciliation state
    pub state: ReconciliationState,
    /// Buyer email
    pub buyer_email: Option<String>,
    /// Buyer display name
    pub buyer_name: Option<String>,
    /// Artworks named by the session
    pub item_ids: Vec<ItemId>,
    /// Artworks marked sold by this call
    pub marked_item_ids: Vec<ItemId>,
    /// Artworks an earlier poll already marked
    pub already_marked: Vec<ItemId>,
    /// Paid artworks that were not marked sold
    pub marking_failures: Vec<MarkingFailure>,
}

impl From<ReconciliationResult> for SessionStatusResponse {
    fn from(result: ReconciliationResult) -> Self {
        Self {
            status: result.session_status,
            payment_status: result.payment_status,
            payment_intent_status: result.payment_intent_status,
            verified: result.verified,
            state: result.state,
            buyer_email: result.buyer_email,
            buyer_name: result.buyer_name,
            item_ids: result.item_ids,
            marked_item_ids: result.marked,
            already_marked: result.already_marked,
            marking_failures: result.marking_failures,
        }
    }
}

/// Verify a session and reconcile the catalog.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/session-status?session_id=cs_test_123"
/// # {"status":"complete","paymentStatus":"paid","paymentIntentStatus":"succeeded",
/// #  "verified":true,"state":"VERIFIED_MARKED",...}
/// ```
///
/// # Errors
///
/// - 400 if `session_id` is missing or is not a provider session id
/// - 502 if the provider fails or a paid session names no artworks
pub async fn session_status(
    State(state): State<AppState>,
    Query(query): Query<SessionStatusQuery>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let session_id = query
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing session_id parameter"))?;
    if !is_session_id(&session_id) {
        return Err(AppError::bad_request("Invalid session_id parameter"));
    }
    let session_id = SessionId::new(session_id);

    match state.coordinator.verify_and_reconcile(&session_id).await {
        Ok(result) => {
            metrics::record_reconciliation(&result);
            Ok(Json(result.into()))
        }
        Err(e) => {
            metrics::record_reconciliation_error();
            Err(e.into())
        }
    }
}

/// Provider session ids are ASCII letters, digits and underscores, e.g.
/// `cs_test_a1B2c3`.
fn is_session_id(id: &str) -> bool {
    id.len() <= 255 && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
