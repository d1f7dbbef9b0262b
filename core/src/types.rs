//! Domain types for the Atelier shop.
//!
//! Items are one-of-a-kind artworks owned by the content store. Sessions are
//! owned by the payment provider; the coordinator only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque, stable identifier of an item in the content store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an `ItemId` from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque payment session identifier issued by the payment provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a `SessionId` from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// ISO 4217 currency code, stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Canadian dollars, the shop's default currency
    pub const DEFAULT_CODE: &'static str = "CAD";

    /// Creates a currency, normalising the code to upper case
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// Upper-case code, e.g. `CAD`
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CODE)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Items
// ============================================================================

/// A unique, sellable artwork.
///
/// `sold` only ever moves from `false` to `true` through this system, and the
/// `sold_*` fields are written together with it, exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier
    pub id: ItemId,
    /// Display and charge title
    pub title: String,
    /// Price in the smallest currency unit (cents)
    pub price_minor_units: i64,
    /// Charge currency
    pub currency: Currency,
    /// Medium, e.g. "Oil on Canvas"
    pub medium: Option<String>,
    /// Physical size, e.g. `18"x24"`
    pub dimensions: Option<String>,
    /// Year the piece was made
    pub year: Option<String>,
    /// Image URLs, first one is the cover
    pub image_urls: Vec<String>,
    /// Whether the piece has been sold
    pub sold: bool,
    /// When the piece was sold
    pub sold_at: Option<DateTime<Utc>>,
    /// Buyer display name
    pub sold_to_name: Option<String>,
    /// Buyer email
    pub sold_to_email: Option<String>,
    /// Session that sold the piece, `None` when sold through another channel
    pub sold_session_id: Option<SessionId>,
}

impl Item {
    /// Creates an unsold item with no catalog extras.
    #[must_use]
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        price_minor_units: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price_minor_units,
            currency,
            medium: None,
            dimensions: None,
            year: None,
            image_urls: Vec::new(),
            sold: false,
            sold_at: None,
            sold_to_name: None,
            sold_to_email: None,
            sold_session_id: None,
        }
    }

    /// Sets the medium
    #[must_use]
    pub fn with_medium(mut self, medium: impl Into<String>) -> Self {
        self.medium = Some(medium.into());
        self
    }

    /// Sets the dimensions
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: impl Into<String>) -> Self {
        self.dimensions = Some(dimensions.into());
        self
    }

    /// Marks the item as sold outside of any payment session.
    #[must_use]
    pub fn sold_elsewhere(mut self) -> Self {
        self.sold = true;
        self
    }

    /// Applies a sale record to this item (the compare-and-set patch).
    pub fn apply_sale(&mut self, sale: &Sale) {
        self.sold = true;
        self.sold_at = Some(sale.sold_at);
        self.sold_to_name.clone_from(&sale.buyer_name);
        self.sold_to_email.clone_from(&sale.buyer_email);
        self.sold_session_id.clone_from(&sale.session_id);
    }

    /// Whether this item was sold by the given session.
    #[must_use]
    pub fn sold_by(&self, session_id: &SessionId) -> bool {
        self.sold && self.sold_session_id.as_ref() == Some(session_id)
    }
}

/// Patch applied when an item becomes sold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sale {
    /// Time of the sale
    pub sold_at: DateTime<Utc>,
    /// Buyer display name recovered from session metadata
    pub buyer_name: Option<String>,
    /// Buyer email reported by the payment provider
    pub buyer_email: Option<String>,
    /// Session that paid for the item
    pub session_id: Option<SessionId>,
}

// ============================================================================
// Checkout Requests
// ============================================================================

/// A checkout attempt for one or more items. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Requested items, in order
    pub item_ids: Vec<ItemId>,
    /// Buyer email
    pub buyer_email: String,
    /// Buyer display name
    pub buyer_name: String,
}

impl ReservationRequest {
    /// Creates a request
    #[must_use]
    pub fn new(
        item_ids: impl IntoIterator<Item = impl Into<ItemId>>,
        buyer_email: impl Into<String>,
        buyer_name: impl Into<String>,
    ) -> Self {
        Self {
            item_ids: item_ids.into_iter().map(Into::into).collect(),
            buyer_email: buyer_email.into(),
            buyer_name: buyer_name.into(),
        }
    }
}

/// One charged line of a payment session. Price and title always come from
/// the content store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineItem {
    /// Item being charged
    pub item_id: ItemId,
    /// Product name shown by the provider
    pub title: String,
    /// Optional product description (the medium)
    pub description: Option<String>,
    /// Unit price in minor units
    pub unit_amount: i64,
    /// Charge currency
    pub currency: Currency,
    /// Always 1 for unique pieces
    pub quantity: u32,
}

impl LineItem {
    /// Builds the line for a single unique item
    #[must_use]
    pub fn for_item(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            title: item.title.clone(),
            description: item.medium.clone(),
            unit_amount: item.price_minor_units,
            currency: item.currency.clone(),
            quantity: 1,
        }
    }
}

// ============================================================================
// Payment Sessions
// ============================================================================

/// Session lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Checkout UI still open
    Open,
    /// Checkout UI finished
    Complete,
    /// Session timed out
    Expired,
    /// A status this crate does not know about
    #[serde(other)]
    Unknown,
}

/// Session-level payment status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not paid yet
    Unpaid,
    /// Funds collected
    Paid,
    /// Nothing to pay (never counts as a sale)
    NoPaymentRequired,
    /// A status this crate does not know about
    #[serde(other)]
    Unknown,
}

/// Payment-intent-level status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    /// Waiting for a payment method
    RequiresPaymentMethod,
    /// Waiting for confirmation
    RequiresConfirmation,
    /// Waiting for customer action (3DS etc.)
    RequiresAction,
    /// Being processed
    Processing,
    /// Authorised, waiting for capture
    RequiresCapture,
    /// Cancelled
    Canceled,
    /// Charge settled
    Succeeded,
    /// A status this crate does not know about
    #[serde(other)]
    Unknown,
}

/// A payment session as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// Secret handed to the embedded checkout UI
    pub client_secret: Option<String>,
    /// Lifecycle status
    pub status: Option<SessionStatus>,
    /// Session payment status
    pub payment_status: Option<PaymentStatus>,
    /// Payment intent status (requires expansion at the provider)
    pub payment_intent_status: Option<PaymentIntentStatus>,
    /// Buyer email as recorded by the provider
    pub customer_email: Option<String>,
    /// String map carrying item ids and buyer name
    pub metadata: BTreeMap<String, String>,
}

impl Session {
    /// Creates a session with no statuses and empty metadata.
    #[must_use]
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            client_secret: None,
            status: None,
            payment_status: None,
            payment_intent_status: None,
            customer_email: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets all three statuses at once.
    #[must_use]
    pub const fn with_statuses(
        mut self,
        status: SessionStatus,
        payment_status: PaymentStatus,
        payment_intent_status: PaymentIntentStatus,
    ) -> Self {
        self.status = Some(status);
        self.payment_status = Some(payment_status);
        self.payment_intent_status = Some(payment_intent_status);
        self
    }

    /// Sets the buyer email
    #[must_use]
    pub fn with_customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    /// Inserts one metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The verified-success predicate.
    ///
    /// Each status on its own can look finished from the UI's point of view
    /// before the charge settles, so all three must agree. A missing status
    /// never verifies.
    #[must_use]
    pub fn is_verified_success(&self) -> bool {
        self.status == Some(SessionStatus::Complete)
            && self.payment_status == Some(PaymentStatus::Paid)
            && self.payment_intent_status == Some(PaymentIntentStatus::Succeeded)
    }
}

/// Everything the provider needs to open a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateSessionRequest {
    /// One line per item
    pub line_items: Vec<LineItem>,
    /// Buyer email, prefilled in the checkout UI
    pub customer_email: String,
    /// Item ids and buyer name, recovered at reconciliation
    pub metadata: BTreeMap<String, String>,
}

/// Handle returned by the provider for a freshly created session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedSession {
    /// Session identifier
    pub session_id: SessionId,
    /// Secret for the embedded checkout UI
    pub client_secret: String,
}
