//! Content store abstraction.
//!
//! The content store owns item records. The coordinator only reads them and
//! flips `sold` through a single compare-and-set, which is the only guard
//! against selling the same piece twice.
//!
//! # Implementations
//!
//! - `PostgresContentStore` (in `atelier-postgres`): conditional `UPDATE`
//! - `InMemoryContentStore` (in `atelier-testing`): lock-protected map
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` so the store can be shared as
//! `Arc<dyn ContentStore>` by the coordinator and the HTTP layer.

use crate::catalog::CatalogFilter;
use crate::error::StoreError;
use crate::types::{Item, ItemId, Sale};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`ContentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Document store keyed by item id.
pub trait ContentStore: Send + Sync {
    /// Fetch one item. Absent items are `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing store cannot be read.
    fn get<'a>(&'a self, id: &'a ItemId) -> StoreFuture<'a, Option<Item>>;

    /// Apply `sale` only if the item's `sold` flag currently equals
    /// `expected_sold`.
    ///
    /// Returns `true` when the update applied, `false` when the flag did not
    /// match or the item does not exist. Two concurrent calls with
    /// `expected_sold = false` can never both return `true`.
    ///
    /// Sale fields are written once. A call with `expected_sold = true` never
    /// applies and returns `false` without touching the item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the update could not be attempted.
    fn compare_and_set_sold<'a>(
        &'a self,
        id: &'a ItemId,
        expected_sold: bool,
        sale: &'a Sale,
    ) -> StoreFuture<'a, bool>;

    /// List items matching `filter`, ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing store cannot be read.
    fn list<'a>(&'a self, filter: &'a CatalogFilter) -> StoreFuture<'a, Vec<Item>>;

    /// Insert or update catalog data for an item.
    ///
    /// Never un-sells: an item that is already sold stays sold with its
    /// original sale fields.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    fn upsert(&self, item: Item) -> StoreFuture<'_, ()>;

    /// Cheap connectivity probe for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
