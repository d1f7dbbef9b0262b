//! # Atelier Testing
//!
//! In-memory stand-ins for the coordinator's dependencies.
//!
//! This crate provides:
//! - [`InMemoryContentStore`]: lock-protected item map with call counters and
//!   failure injection
//! - [`MockPaymentProvider`]: scripted payment sessions
//! - [`FixedClock`]: deterministic time
//!
//! The in-memory store is also what the server runs on with
//! `CONTENT_STORE=memory`.
//!
//! ## Example
//!
//! ```ignore
//! use atelier_testing::{InMemoryContentStore, MockPaymentProvider, test_clock};
//!
//! #[tokio::test]
//! async fn test_checkout_flow() {
//!     let store = InMemoryContentStore::with_items([item("p1", 45_000)]);
//!     let provider = MockPaymentProvider::new();
//!     let coordinator = Coordinator::new(
//!         Arc::new(store.clone()),
//!         Arc::new(provider.clone()),
//!         Arc::new(test_clock()),
//!     );
//!
//!     let started = coordinator.begin_checkout(&request).await.unwrap();
//!     provider.settle(&started.session_id);
//!     coordinator.verify_and_reconcile(&started.session_id).await.unwrap();
//!
//!     assert!(store.item("p1").unwrap().sold);
//! }
//! ```

use atelier_core::environment::Clock;
use chrono::{DateTime, Utc};

mod content_store;
mod payment_provider;

pub use content_store::InMemoryContentStore;
pub use payment_provider::MockPaymentProvider;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use atelier_testing::mocks::FixedClock;
    /// use atelier_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
