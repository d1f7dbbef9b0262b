//! Session metadata codec.
//!
//! The provider's metadata is a flat string map with a per-value size limit,
//! so the list of purchased item ids travels as one JSON-encoded string and is
//! decoded again at reconciliation time. The limit caps how many items one
//! checkout can hold.

use crate::error::ValidationError;
use crate::types::ItemId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key holding the JSON array of item ids.
pub const ITEM_IDS_KEY: &str = "artwork_ids";

/// Single-item key written by older sessions.
pub const LEGACY_ITEM_ID_KEY: &str = "artwork_id";

/// Key holding the buyer display name.
pub const BUYER_NAME_KEY: &str = "customer_name";

/// Maximum length of one metadata value at the provider.
pub const MAX_VALUE_LEN: usize = 500;

/// An encoded value exceeds the provider limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("metadata value for {key} is {len} characters, limit is {limit}")]
pub struct ValueTooLong {
    /// Metadata key
    pub key: &'static str,
    /// Encoded length
    pub len: usize,
    /// Provider limit
    pub limit: usize,
}

impl From<ValueTooLong> for ValidationError {
    fn from(err: ValueTooLong) -> Self {
        Self::TooManyItems {
            encoded_len: err.len,
            limit: err.limit,
        }
    }
}

/// Metadata decode failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Neither the list key nor the legacy key is present.
    #[error("no item ids in session metadata")]
    Missing,

    /// The id list is not a JSON array of strings.
    #[error("malformed item id list: {0}")]
    Malformed(String),

    /// The id list decoded to nothing.
    #[error("item id list is empty")]
    Empty,
}

/// Encode item ids as a JSON array string, enforcing the provider limit.
///
/// # Errors
///
/// Returns `ValueTooLong` if the encoded list does not fit.
pub fn encode_item_ids(ids: &[ItemId]) -> Result<String, ValueTooLong> {
    let encoded = serde_json::Value::from(
        ids.iter().map(|id| id.as_str().to_string()).collect::<Vec<_>>(),
    )
    .to_string();
    let len = encoded.chars().count();
    if len > MAX_VALUE_LEN {
        return Err(ValueTooLong {
            key: ITEM_IDS_KEY,
            len,
            limit: MAX_VALUE_LEN,
        });
    }
    Ok(encoded)
}

/// Recover the item ids from session metadata.
///
/// Prefers [`ITEM_IDS_KEY`]; falls back to the single-item
/// [`LEGACY_ITEM_ID_KEY`] written by older sessions.
///
/// # Errors
///
/// Returns `MetadataError` if no usable ids are present.
pub fn decode_item_ids(metadata: &BTreeMap<String, String>) -> Result<Vec<ItemId>, MetadataError> {
    let ids: Vec<ItemId> = if let Some(raw) = metadata.get(ITEM_IDS_KEY) {
        serde_json::from_str(raw).map_err(|e| MetadataError::Malformed(e.to_string()))?
    } else if let Some(legacy) = metadata.get(LEGACY_ITEM_ID_KEY) {
        vec![ItemId::new(legacy.trim())]
    } else {
        return Err(MetadataError::Missing);
    };

    if ids.is_empty() || ids.iter().any(|id| id.as_str().is_empty()) {
        return Err(MetadataError::Empty);
    }
    Ok(ids)
}

/// Buyer display name, if one was recorded.
#[must_use]
pub fn buyer_name(metadata: &BTreeMap<String, String>) -> Option<String> {
    metadata
        .get(BUYER_NAME_KEY)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Build the metadata map for a new session.
///
/// The buyer name is cut to the provider limit rather than rejected.
///
/// # Errors
///
/// Returns `ValueTooLong` if the id list does not fit.
pub fn build(ids: &[ItemId], buyer_name: &str) -> Result<BTreeMap<String, String>, ValueTooLong> {
    let mut metadata = BTreeMap::new();
    metadata.insert(ITEM_IDS_KEY.to_string(), encode_item_ids(ids)?);
    let name: String = buyer_name.chars().take(MAX_VALUE_LEN).collect();
    if !name.is_empty() {
        metadata.insert(BUYER_NAME_KEY.to_string(), name);
    }
    Ok(metadata)
}
