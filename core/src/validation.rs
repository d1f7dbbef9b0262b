//! Request validation that runs before any external call.

use crate::error::ValidationError;
use crate::metadata;
use crate::types::{ItemId, ReservationRequest};
use std::collections::HashSet;

/// Basic email shape check.
///
/// Accepts `local@domain.tld` where no part contains `@` or whitespace and the
/// domain has a dot with at least one character on each side of it.
///
/// # Examples
///
/// ```
/// use atelier_core::validation::is_valid_email;
///
/// assert!(is_valid_email("a@b.com"));
/// assert!(is_valid_email("first.last+tag@studio.art.ca"));
/// assert!(!is_valid_email("not-an-email"));
/// assert!(!is_valid_email("a@b"));
/// assert!(!is_valid_email("a b@c.com"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let well_formed =
        |part: &str| !part.is_empty() && !part.contains('@') && !part.contains(char::is_whitespace);
    if !well_formed(local) || !well_formed(domain) {
        return false;
    }

    // Some dot must have a character on both sides.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Validate and normalise a checkout request.
///
/// Checks, in order: the item list is non-empty, the email has a valid shape,
/// no item is requested twice, and the id list fits the provider's metadata.
/// Email and name are trimmed.
///
/// # Errors
///
/// Returns the first `ValidationError` found.
pub fn validate_request(request: &ReservationRequest) -> Result<ReservationRequest, ValidationError> {
    if request.item_ids.is_empty() {
        return Err(ValidationError::EmptyItemList);
    }

    let buyer_email = request.buyer_email.trim();
    if !is_valid_email(buyer_email) {
        return Err(ValidationError::InvalidEmail {
            email: buyer_email.to_string(),
        });
    }

    let mut seen: HashSet<&ItemId> = HashSet::with_capacity(request.item_ids.len());
    for item_id in &request.item_ids {
        if !seen.insert(item_id) {
            return Err(ValidationError::DuplicateItem {
                item_id: item_id.clone(),
            });
        }
    }

    metadata::encode_item_ids(&request.item_ids)?;

    Ok(ReservationRequest {
        item_ids: request.item_ids.clone(),
        buyer_email: buyer_email.to_string(),
        buyer_name: request.buyer_name.trim().to_string(),
    })
}
