//! # Atelier Core
//!
//! Checkout and reservation consistency for a shop that sells one-of-a-kind
//! artworks through a hosted payment provider.
//!
//! The hard problem is keeping two systems consistent with no shared
//! transaction: the content store that knows which pieces are sold, and the
//! payment provider that knows which sessions were paid. This crate does it
//! with two stateless operations on [`Coordinator`]:
//!
//! - **`begin_checkout`**: validate, check availability, open a session whose
//!   metadata names the items being bought
//! - **`verify_and_reconcile`**: trust the provider only when session status,
//!   payment status and payment intent status all agree, then mark each item
//!   sold through a compare-and-set so it can never be sold twice
//!
//! ## Seams
//!
//! - [`ContentStore`]: item documents with a conditional `sold` update
//! - [`PaymentProvider`]: session creation and retrieval
//! - [`environment::Clock`]: time of sale
//!
//! ## Example
//!
//! ```ignore
//! use atelier_core::*;
//!
//! let coordinator = Coordinator::new(store, provider, Arc::new(SystemClock));
//!
//! let started = coordinator
//!     .begin_checkout(&ReservationRequest::new(["p1"], "a@b.com", "Ada"))
//!     .await?;
//!
//! // ... buyer pays in the embedded checkout, browser lands on /success ...
//!
//! let result = coordinator.verify_and_reconcile(&started.session_id).await?;
//! assert!(result.verified);
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod metadata;
pub mod payment;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use catalog::{Availability, CatalogFilter, LegacyArtwork};
pub use chrono::{DateTime, Utc};
pub use coordinator::{
    CheckoutStarted, Coordinator, MarkingFailure, MarkingFailureReason, ReconciliationResult,
    ReconciliationState,
};
pub use environment::{Clock, SystemClock};
pub use error::{CheckoutError, ProviderError, StoreError, ValidationError};
pub use payment::{PaymentProvider, RetrieveOptions};
pub use store::ContentStore;
pub use types::{
    CreateSessionRequest, CreatedSession, Currency, Item, ItemId, LineItem, PaymentIntentStatus,
    PaymentStatus, ReservationRequest, Sale, Session, SessionId, SessionStatus,
};

/// Environment module - injected dependencies that are not stores or providers.
///
/// Production code uses [`SystemClock`](environment::SystemClock); tests use
/// `FixedClock` from `atelier-testing` so sale timestamps are deterministic.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_core::environment::{Clock, SystemClock};
    ///
    /// let now = SystemClock.now();
    /// assert!(now.timestamp() > 0);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
