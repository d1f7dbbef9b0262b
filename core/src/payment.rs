//! Payment provider abstraction.
//!
//! The provider issues opaque session handles and is the source of truth for
//! whether a payment settled. It is treated as a trustworthy oracle once the
//! three session statuses agree (see [`Session::is_verified_success`]).

use crate::error::ProviderError;
use crate::types::{CreateSessionRequest, CreatedSession, Session, SessionId};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`PaymentProvider`] methods.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Options for retrieving a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Related objects to expand inline
    pub expand: Vec<String>,
}

impl RetrieveOptions {
    /// Expansion key for the payment intent
    pub const PAYMENT_INTENT: &'static str = "payment_intent";

    /// Expand the payment intent so its status is available.
    #[must_use]
    pub fn with_payment_intent() -> Self {
        Self {
            expand: vec![Self::PAYMENT_INTENT.to_string()],
        }
    }

    /// Whether `key` should be expanded
    #[must_use]
    pub fn expands(&self, key: &str) -> bool {
        self.expand.iter().any(|k| k == key)
    }
}

/// Third-party payment processor.
///
/// Calls are single round trips. Implementations must not retry
/// `create_session` on their own: a retry is a fresh checkout.
pub trait PaymentProvider: Send + Sync {
    /// Open a payment session for the given line items.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the provider rejects the request or is unreachable.
    fn create_session(&self, request: CreateSessionRequest) -> ProviderFuture<'_, CreatedSession>;

    /// Look up the current state of a session.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the session is unknown or the provider is unreachable.
    fn retrieve_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        options: &'a RetrieveOptions,
    ) -> ProviderFuture<'a, Session>;
}
