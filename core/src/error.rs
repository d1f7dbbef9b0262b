//! Error taxonomy for checkout and reconciliation.
//!
//! Validation and availability errors are raised before any side effect.
//! Provider errors carry no compensation because nothing has been charged.
//! Store-update failures during reconciliation are not errors at all: they are
//! reported per item in [`crate::coordinator::MarkingFailure`].

use crate::types::{ItemId, SessionId};
use thiserror::Error;

/// Bad input shape. Not retryable without a client-side fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No item ids were supplied.
    #[error("at least one item is required")]
    EmptyItemList,

    /// The buyer email does not look like an email address.
    #[error("invalid email address: {email}")]
    InvalidEmail {
        /// The rejected value
        email: String,
    },

    /// The same item was requested twice.
    #[error("item {item_id} was requested more than once")]
    DuplicateItem {
        /// The repeated item
        item_id: ItemId,
    },

    /// The item list does not fit the provider's metadata limit.
    #[error("too many items for one checkout: encoded ids are {encoded_len} characters, limit is {limit}")]
    TooManyItems {
        /// Encoded length of the id list
        encoded_len: usize,
        /// Provider metadata value limit
        limit: usize,
    },

    /// Items in one checkout must share a currency.
    #[error("item {item_id} is priced in {found}, expected {expected}")]
    MixedCurrency {
        /// Offending item
        item_id: ItemId,
        /// Currency of the first item
        expected: String,
        /// Currency of this item
        found: String,
    },

    /// The item has no sale price.
    #[error("item {item_id} is not for sale")]
    NotForSale {
        /// Unpriced item
        item_id: ItemId,
    },
}

impl ValidationError {
    /// Name of the request field this error refers to, for field-level messages.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidEmail { .. } => "buyerEmail",
            Self::EmptyItemList
            | Self::DuplicateItem { .. }
            | Self::TooManyItems { .. }
            | Self::MixedCurrency { .. }
            | Self::NotForSale { .. } => "itemIds",
        }
    }
}

/// Errors returned by a content store implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store is not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by a payment provider implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never got a response.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The provider answered with an error.
    #[error("Provider error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the provider
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),
}

/// Errors surfaced by [`crate::coordinator::Coordinator`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Bad input shape.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown item id.
    #[error("item {item_id} not found")]
    NotFound {
        /// The unknown id
        item_id: ItemId,
    },

    /// The item has already been sold.
    #[error("\"{title}\" ({item_id}) has already been sold")]
    AlreadySold {
        /// Sold item
        item_id: ItemId,
        /// Its title, for the "this piece was just sold" message
        title: String,
    },

    /// The payment provider failed. The caller may retry the whole checkout.
    #[error("payment provider error: {message}")]
    PaymentProvider {
        /// Provider failure description
        message: String,
    },

    /// A verified session whose metadata does not name any items.
    #[error("session {session_id} has unusable metadata: {reason}")]
    InvalidSessionMetadata {
        /// The paid session
        session_id: SessionId,
        /// Why decoding failed
        reason: String,
    },

    /// Reading from the content store failed during checkout.
    #[error("content store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ProviderError> for CheckoutError {
    fn from(err: ProviderError) -> Self {
        Self::PaymentProvider {
            message: err.to_string(),
        }
    }
}

impl CheckoutError {
    /// Whether retrying the same call could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PaymentProvider { .. } | Self::Store(_))
    }
}
