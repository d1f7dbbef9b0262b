//! Business metrics for the shop.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `atelier_checkouts_total{outcome}` - Checkout attempts by outcome
//! - `atelier_reconciliations_total{outcome}` - Session status polls by outcome
//! - `atelier_items_sold_total` - Items moved to sold
//! - `atelier_marking_failures_total{reason}` - Paid items reported as not marked
//!   sold, once per status poll
//!
//! A session that keeps being polled reports the same failed item again, so
//! `atelier_marking_failures_total` counts reports, not distinct refunds. The
//! items to resolve come from the `Paid item not marked sold` warnings.

use atelier_core::coordinator::{MarkingFailureReason, ReconciliationResult, ReconciliationState};
use atelier_core::error::CheckoutError;
use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "atelier_checkouts_total",
        "Checkout attempts by outcome (started, invalid, not_found, already_sold, provider_error, store_error)"
    );
    describe_counter!(
        "atelier_reconciliations_total",
        "Session status polls by outcome (unverified, pending_mark, marked, error)"
    );
    describe_counter!(
        "atelier_items_sold_total",
        "Total number of items marked sold through paid sessions"
    );
    describe_counter!(
        "atelier_marking_failures_total",
        "Paid items reported as not marked sold, by reason, counted on every status poll that reports them"
    );

    tracing::info!("Business metrics registered");
}

/// Record a checkout that opened a payment session.
pub fn record_checkout_started() {
    metrics::counter!("atelier_checkouts_total", "outcome" => "started").increment(1);
}

/// Record a checkout that was refused.
pub fn record_checkout_failed(error: &CheckoutError) {
    let outcome = match error {
        CheckoutError::Validation(_) => "invalid",
        CheckoutError::NotFound { .. } => "not_found",
        CheckoutError::AlreadySold { .. } => "already_sold",
        CheckoutError::PaymentProvider { .. } | CheckoutError::InvalidSessionMetadata { .. } => {
            "provider_error"
        }
        CheckoutError::Store(_) => "store_error",
    };
    metrics::counter!("atelier_checkouts_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded checkout_failed metric");
}

/// Record the outcome of one reconciliation.
///
/// Every marking failure in `result` is counted, including failures an
/// earlier poll of the same session already reported.
pub fn record_reconciliation(result: &ReconciliationResult) {
    let outcome = match result.state {
        ReconciliationState::Unverified => "unverified",
        ReconciliationState::VerifiedPendingMark => "pending_mark",
        ReconciliationState::VerifiedMarked => "marked",
    };
    metrics::counter!("atelier_reconciliations_total", "outcome" => outcome).increment(1);

    if !result.marked.is_empty() {
        let sold = u64::try_from(result.marked.len()).unwrap_or(u64::MAX);
        metrics::counter!("atelier_items_sold_total").increment(sold);
    }

    for failure in &result.marking_failures {
        let reason = match failure.reason {
            MarkingFailureReason::SoldToAnotherBuyer => "sold_to_another_buyer",
            MarkingFailureReason::ItemMissing => "item_missing",
            MarkingFailureReason::StoreUpdate { .. } => "store_update",
        };
        metrics::counter!("atelier_marking_failures_total", "reason" => reason).increment(1);
    }
}

/// Record a reconciliation that failed before any item was examined.
pub fn record_reconciliation_error() {
    metrics::counter!("atelier_reconciliations_total", "outcome" => "error").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::coordinator::MarkingFailure;
    use atelier_core::types::ItemId;
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn lost_race() -> ReconciliationResult {
        ReconciliationResult {
            state: ReconciliationState::VerifiedMarked,
            verified: true,
            session_status: None,
            payment_status: None,
            payment_intent_status: None,
            item_ids: vec![ItemId::new("p1")],
            buyer_name: None,
            buyer_email: None,
            marked: Vec::new(),
            already_marked: Vec::new(),
            marking_failures: vec![MarkingFailure {
                item_id: ItemId::new("p1"),
                reason: MarkingFailureReason::SoldToAnotherBuyer,
            }],
        }
    }

    #[test]
    fn test_marking_failures_count_each_poll() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_reconciliation(&lost_race());
            record_reconciliation(&lost_race());
        });

        let rendered = handle.render();
        assert!(
            rendered.contains(r#"atelier_marking_failures_total{reason="sold_to_another_buyer"} 2"#),
            "{rendered}"
        );
        assert!(rendered.contains(r#"atelier_reconciliations_total{outcome="marked"} 2"#));
        assert!(!rendered.contains("atelier_items_sold_total"));
    }
}
