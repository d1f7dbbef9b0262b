//! Checkout coordinator.
//!
//! Two stateless operations sit between the buyer, the content store and the
//! payment provider:
//!
//! - [`Coordinator::begin_checkout`] checks availability and opens a payment
//!   session that remembers which items it is for.
//! - [`Coordinator::verify_and_reconcile`] asks the provider whether that
//!   session really settled and, only then, flips each item to sold.
//!
//! Items are not held while the buyer pays. Two buyers can both open a
//! session for the same piece; the store's compare-and-set decides who gets
//! it and the loser is reported for manual resolution.

use crate::environment::Clock;
use crate::error::{CheckoutError, ValidationError};
use crate::metadata;
use crate::payment::{PaymentProvider, RetrieveOptions};
use crate::store::ContentStore;
use crate::types::{
    CreateSessionRequest, Currency, Item, ItemId, LineItem, PaymentIntentStatus, PaymentStatus,
    ReservationRequest, Sale, SessionId, SessionStatus,
};
use crate::validation::validate_request;
use serde::Serialize;
use std::sync::Arc;

// ============================================================================
// Results
// ============================================================================

/// Handle returned to the browser to mount the embedded checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutStarted {
    /// Provider session
    pub session_id: SessionId,
    /// Secret for the embedded checkout UI
    pub client_secret: String,
}

/// Where a session stands after reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationState {
    /// The provider does not report a settled payment. Nothing was touched.
    Unverified,
    /// Payment settled but some items could not be written; calling again retries them.
    VerifiedPendingMark,
    /// Payment settled and every item was handled.
    VerifiedMarked,
}

/// Why one item of a paid session was not marked sold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MarkingFailureReason {
    /// Another session (or the artist) already sold it. Needs a refund.
    SoldToAnotherBuyer,
    /// The item no longer exists in the store.
    ItemMissing,
    /// The store rejected or failed the update.
    StoreUpdate {
        /// Store failure description
        message: String,
    },
}

/// An item the buyer paid for but did not get marked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarkingFailure {
    /// Affected item
    pub item_id: ItemId,
    /// What went wrong
    #[serde(flatten)]
    pub reason: MarkingFailureReason,
}

impl MarkingFailure {
    /// Whether calling reconcile again could fix this item.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.reason, MarkingFailureReason::StoreUpdate { .. })
    }
}

/// Outcome of [`Coordinator::verify_and_reconcile`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Overall state
    pub state: ReconciliationState,
    /// Whether the three statuses agreed on a settled payment
    pub verified: bool,
    /// Raw session status, for the status page
    pub session_status: Option<SessionStatus>,
    /// Raw payment status
    pub payment_status: Option<PaymentStatus>,
    /// Raw payment intent status
    pub payment_intent_status: Option<PaymentIntentStatus>,
    /// Items named by the session (empty when unverified)
    pub item_ids: Vec<ItemId>,
    /// Buyer display name from the session metadata
    pub buyer_name: Option<String>,
    /// Buyer email from the provider
    pub buyer_email: Option<String>,
    /// Items this call moved to sold
    pub marked: Vec<ItemId>,
    /// Items an earlier call with the same session already marked
    pub already_marked: Vec<ItemId>,
    /// Paid items that need manual resolution or a retry
    pub marking_failures: Vec<MarkingFailure>,
}

impl ReconciliationResult {
    /// Whether any paid item was not marked sold.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        !self.marking_failures.is_empty()
    }
}

enum MarkOutcome {
    Marked,
    AlreadyMarked,
    Failed(MarkingFailureReason),
}

// ============================================================================
// Coordinator
// ============================================================================

/// Stateless checkout and reconciliation service.
///
/// Cheap to clone; all dependencies are shared.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn ContentStore>,
    provider: Arc<dyn PaymentProvider>,
    clock: Arc<dyn Clock>,
}

impl Coordinator {
    /// Creates a coordinator over the given store, provider and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        provider: Arc<dyn PaymentProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
        }
    }

    /// The content store this coordinator reads and marks.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Validate a request, check availability and open a payment session.
    ///
    /// Nothing is written to the content store. Prices and titles come from
    /// the store, never from the caller. The provider is called exactly once
    /// and only after every item has been checked.
    ///
    /// # Errors
    ///
    /// - `Validation` for bad input, before any external call
    /// - `NotFound` / `AlreadySold` for the first unavailable item
    /// - `Store` if an item could not be read
    /// - `PaymentProvider` if the session could not be created
    pub async fn begin_checkout(
        &self,
        request: &ReservationRequest,
    ) -> Result<CheckoutStarted, CheckoutError> {
        let request = validate_request(request)?;

        let mut items = Vec::with_capacity(request.item_ids.len());
        for item_id in &request.item_ids {
            let item = self
                .store
                .get(item_id)
                .await?
                .ok_or_else(|| CheckoutError::NotFound {
                    item_id: item_id.clone(),
                })?;
            if item.sold {
                tracing::info!(item_id = %item_id, "Checkout refused, item already sold");
                return Err(CheckoutError::AlreadySold {
                    item_id: item.id,
                    title: item.title,
                });
            }
            items.push(item);
        }

        check_sellable(&items)?;

        let line_items: Vec<LineItem> = items.iter().map(LineItem::for_item).collect();
        let metadata = metadata::build(&request.item_ids, &request.buyer_name)
            .map_err(ValidationError::from)?;

        let created = self
            .provider
            .create_session(CreateSessionRequest {
                line_items,
                customer_email: request.buyer_email.clone(),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Payment session creation failed");
                CheckoutError::from(e)
            })?;

        tracing::info!(
            session_id = %created.session_id,
            items = request.item_ids.len(),
            "Checkout session created"
        );

        Ok(CheckoutStarted {
            session_id: created.session_id,
            client_secret: created.client_secret,
        })
    }

    /// Verify a session with the provider and mark its items sold.
    ///
    /// Safe to call any number of times for the same session: items already
    /// sold by this session are reported in `already_marked` and never
    /// rewritten. Store failures do not abort the loop; every item is
    /// attempted and failures are listed in the result.
    ///
    /// # Errors
    ///
    /// - `PaymentProvider` if the session could not be retrieved
    /// - `InvalidSessionMetadata` if a verified session names no usable items
    pub async fn verify_and_reconcile(
        &self,
        session_id: &SessionId,
    ) -> Result<ReconciliationResult, CheckoutError> {
        let options = RetrieveOptions::with_payment_intent();
        let session = self
            .provider
            .retrieve_session(session_id, &options)
            .await?;

        let mut result = ReconciliationResult {
            state: ReconciliationState::Unverified,
            verified: false,
            session_status: session.status,
            payment_status: session.payment_status,
            payment_intent_status: session.payment_intent_status,
            item_ids: Vec::new(),
            buyer_name: None,
            buyer_email: session.customer_email.clone(),
            marked: Vec::new(),
            already_marked: Vec::new(),
            marking_failures: Vec::new(),
        };

        if !session.is_verified_success() {
            tracing::debug!(
                session_id = %session_id,
                status = ?session.status,
                payment_status = ?session.payment_status,
                payment_intent_status = ?session.payment_intent_status,
                "Session not settled, nothing to reconcile"
            );
            return Ok(result);
        }

        let item_ids = metadata::decode_item_ids(&session.metadata).map_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "Paid session has unusable metadata");
            CheckoutError::InvalidSessionMetadata {
                session_id: session_id.clone(),
                reason: e.to_string(),
            }
        })?;

        let sale = Sale {
            sold_at: self.clock.now(),
            buyer_name: metadata::buyer_name(&session.metadata),
            buyer_email: session.customer_email.clone(),
            session_id: Some(session_id.clone()),
        };

        result.verified = true;
        result.buyer_name.clone_from(&sale.buyer_name);

        for item_id in &item_ids {
            match self.mark_item(item_id, &sale, session_id).await {
                MarkOutcome::Marked => result.marked.push(item_id.clone()),
                MarkOutcome::AlreadyMarked => result.already_marked.push(item_id.clone()),
                MarkOutcome::Failed(reason) => {
                    tracing::error!(
                        session_id = %session_id,
                        item_id = %item_id,
                        reason = ?reason,
                        "Paid item not marked sold, needs manual resolution"
                    );
                    result.marking_failures.push(MarkingFailure {
                        item_id: item_id.clone(),
                        reason,
                    });
                }
            }
        }

        result.item_ids = item_ids;
        result.state = if result.marking_failures.iter().any(MarkingFailure::is_retryable) {
            ReconciliationState::VerifiedPendingMark
        } else {
            ReconciliationState::VerifiedMarked
        };

        tracing::info!(
            session_id = %session_id,
            marked = result.marked.len(),
            already_marked = result.already_marked.len(),
            failures = result.marking_failures.len(),
            "Session reconciled"
        );

        Ok(result)
    }

    async fn mark_item(&self, item_id: &ItemId, sale: &Sale, session_id: &SessionId) -> MarkOutcome {
        let current = match self.store.get(item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => return MarkOutcome::Failed(MarkingFailureReason::ItemMissing),
            Err(e) => {
                return MarkOutcome::Failed(MarkingFailureReason::StoreUpdate {
                    message: e.to_string(),
                });
            }
        };

        if current.sold {
            return classify_sold(&current, session_id);
        }

        match self.store.compare_and_set_sold(item_id, false, sale).await {
            Ok(true) => {
                tracing::info!(session_id = %session_id, item_id = %item_id, "Item marked sold");
                MarkOutcome::Marked
            }
            // Lost the race: find out who won.
            Ok(false) => match self.store.get(item_id).await {
                Ok(Some(item)) if item.sold => classify_sold(&item, session_id),
                Ok(Some(_)) => MarkOutcome::Failed(MarkingFailureReason::StoreUpdate {
                    message: "compare-and-set rejected an unsold item".to_string(),
                }),
                Ok(None) => MarkOutcome::Failed(MarkingFailureReason::ItemMissing),
                Err(e) => MarkOutcome::Failed(MarkingFailureReason::StoreUpdate {
                    message: e.to_string(),
                }),
            },
            Err(e) => MarkOutcome::Failed(MarkingFailureReason::StoreUpdate {
                message: e.to_string(),
            }),
        }
    }
}

fn classify_sold(item: &Item, session_id: &SessionId) -> MarkOutcome {
    if item.sold_by(session_id) {
        MarkOutcome::AlreadyMarked
    } else {
        MarkOutcome::Failed(MarkingFailureReason::SoldToAnotherBuyer)
    }
}

/// One session charges one currency, and unpriced pieces cannot be bought.
fn check_sellable(items: &[Item]) -> Result<(), ValidationError> {
    let Some(first) = items.first() else {
        return Err(ValidationError::EmptyItemList);
    };
    let currency: &Currency = &first.currency;

    for item in items {
        if item.price_minor_units <= 0 {
            return Err(ValidationError::NotForSale {
                item_id: item.id.clone(),
            });
        }
        if &item.currency != currency {
            return Err(ValidationError::MixedCurrency {
                item_id: item.id.clone(),
                expected: currency.code().to_string(),
                found: item.currency.code().to_string(),
            });
        }
    }
    Ok(())
}
