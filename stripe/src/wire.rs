//! Stripe request and response shapes.
//!
//! Only the fields the shop reads are modelled. Checkout Session requests are
//! `application/x-www-form-urlencoded` with bracketed keys.

use atelier_core::types::{
    CreateSessionRequest, PaymentIntentStatus, PaymentStatus, Session, SessionId, SessionStatus,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Build the form body for `POST /checkout/sessions`.
///
/// Embedded UI mode, one-off payment, one `price_data` line per item.
#[must_use]
pub fn session_form(request: &CreateSessionRequest, return_url: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("ui_mode".to_string(), "embedded".to_string()),
        ("return_url".to_string(), return_url.to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
    ];

    for (i, line) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            line.currency.code().to_ascii_lowercase(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.title.clone(),
        ));
        if let Some(description) = line.description.as_deref().filter(|d| !d.trim().is_empty()) {
            form.push((
                format!("{prefix}[price_data][product_data][description]"),
                description.to_string(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }

    for (k, v) in &request.metadata {
        form.push((format!("metadata[{k}]"), v.clone()));
    }

    form
}

/// Error envelope returned by Stripe on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    /// Error body
    pub error: ErrorBody,
}

/// Stripe error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Error type, e.g. `invalid_request_error`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A Checkout Session object.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    /// `cs_...`
    pub id: String,
    /// Secret for the embedded UI
    #[serde(default)]
    pub client_secret: Option<String>,
    /// `open`, `complete` or `expired`
    #[serde(default)]
    pub status: Option<SessionStatus>,
    /// `paid`, `unpaid` or `no_payment_required`
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// Id, or the full object when expanded
    #[serde(default)]
    pub payment_intent: Option<PaymentIntentRef>,
    /// Email supplied at creation
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Details collected by the checkout UI
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// String metadata
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// An expandable payment intent reference.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentIntentRef {
    /// Expanded object
    Expanded(PaymentIntent),
    /// Bare id (`pi_...`)
    Id(String),
}

/// The fields of a payment intent that matter here.
#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    /// `pi_...`
    pub id: String,
    /// Intent status
    #[serde(default)]
    pub status: Option<PaymentIntentStatus>,
}

/// Customer details collected at checkout.
#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    /// Email entered by the buyer
    #[serde(default)]
    pub email: Option<String>,
    /// Name entered by the buyer
    #[serde(default)]
    pub name: Option<String>,
}

impl From<CheckoutSession> for Session {
    fn from(wire: CheckoutSession) -> Self {
        let payment_intent_status = match wire.payment_intent {
            Some(PaymentIntentRef::Expanded(intent)) => intent.status,
            Some(PaymentIntentRef::Id(_)) | None => None,
        };
        let customer_email = wire
            .customer_email
            .or_else(|| wire.customer_details.and_then(|details| details.email));

        Self {
            id: SessionId::new(wire.id),
            client_secret: wire.client_secret,
            status: wire.status,
            payment_status: wire.payment_status,
            payment_intent_status,
            customer_email,
            metadata: wire.metadata.unwrap_or_default(),
        }
    }
}
