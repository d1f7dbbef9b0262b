//! In-memory content store.

use atelier_core::catalog::CatalogFilter;
use atelier_core::error::StoreError;
use atelier_core::store::{ContentStore, StoreFuture};
use atelier_core::types::{Item, ItemId, Sale};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicUsize,
    cas_attempts: AtomicUsize,
    cas_applied: AtomicUsize,
    lists: AtomicUsize,
}

#[derive(Debug, Default)]
struct Faults {
    failing_updates: RwLock<HashSet<ItemId>>,
    fail_reads: AtomicBool,
    yield_before_cas: AtomicBool,
}

/// Item map behind a lock. The compare-and-set runs entirely under the write
/// lock, so it is atomic with respect to every other call.
///
/// Clones share the same data, counters and injected faults.
///
/// # Example
///
/// ```
/// use atelier_core::store::ContentStore;
/// use atelier_core::types::{Currency, Item, ItemId};
/// use atelier_testing::InMemoryContentStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryContentStore::with_items([
///     Item::new("p1", "Blue Frog", 45_000, Currency::default()),
/// ]);
///
/// let item = store.get(&ItemId::new("p1")).await.unwrap();
/// assert_eq!(item.map(|i| i.title), Some("Blue Frog".to_string()));
/// assert_eq!(store.get_calls(), 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryContentStore {
    items: Arc<RwLock<BTreeMap<ItemId, Item>>>,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
}

impl InMemoryContentStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `items`
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let store = Self::new();
        for item in items {
            store.insert(item);
        }
        store
    }

    /// Insert or replace an item directly, bypassing the never-unsell rule
    pub fn insert(&self, item: Item) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.id.clone(), item);
    }

    /// Snapshot of one item
    #[must_use]
    pub fn item(&self, id: &str) -> Option<Item> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ItemId::new(id))
            .cloned()
    }

    /// Number of stored items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every compare-and-set on `id` fail with a store error.
    pub fn fail_updates_for(&self, id: &str) {
        self.faults
            .failing_updates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ItemId::new(id));
    }

    /// Undo [`fail_updates_for`](Self::fail_updates_for) for every item.
    pub fn heal_updates(&self) {
        self.faults
            .failing_updates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make reads (`get`, `list`, `ping`) fail.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Yield to the scheduler before each compare-and-set so concurrent
    /// reconciliations interleave between their read and their write.
    #[must_use]
    pub fn with_cas_yield(self) -> Self {
        self.faults.yield_before_cas.store(true, Ordering::SeqCst);
        self
    }

    /// Number of `get` calls
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.counters.gets.load(Ordering::SeqCst)
    }

    /// Number of compare-and-set attempts
    #[must_use]
    pub fn cas_calls(&self) -> usize {
        self.counters.cas_attempts.load(Ordering::SeqCst)
    }

    /// Number of compare-and-set calls that changed an item
    #[must_use]
    pub fn cas_applied(&self) -> usize {
        self.counters.cas_applied.load(Ordering::SeqCst)
    }

    /// Number of `list` calls
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.counters.lists.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.faults.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn update_fails(&self, id: &ItemId) -> bool {
        self.faults
            .failing_updates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

impl ContentStore for InMemoryContentStore {
    fn get<'a>(&'a self, id: &'a ItemId) -> StoreFuture<'a, Option<Item>> {
        Box::pin(async move {
            self.counters.gets.fetch_add(1, Ordering::SeqCst);
            self.check_reads()?;
            Ok(self
                .items
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(id)
                .cloned())
        })
    }

    fn compare_and_set_sold<'a>(
        &'a self,
        id: &'a ItemId,
        expected_sold: bool,
        sale: &'a Sale,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.counters.cas_attempts.fetch_add(1, Ordering::SeqCst);
            if self.faults.yield_before_cas.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            if self.update_fails(id) {
                return Err(StoreError::Database(format!("injected update failure for {id}")));
            }

            let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
            let Some(item) = items.get_mut(id) else {
                return Ok(false);
            };
            if expected_sold || item.sold {
                return Ok(false);
            }
            item.apply_sale(sale);
            self.counters.cas_applied.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        })
    }

    fn list<'a>(&'a self, filter: &'a CatalogFilter) -> StoreFuture<'a, Vec<Item>> {
        Box::pin(async move {
            self.counters.lists.fetch_add(1, Ordering::SeqCst);
            self.check_reads()?;
            let mut items: Vec<Item> = self
                .items
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .filter(|item| filter.matches(item))
                .cloned()
                .collect();
            items.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
            Ok(items)
        })
    }

    fn upsert(&self, item: Item) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
            match items.get_mut(&item.id) {
                Some(existing) if existing.sold => {
                    let sold = existing.clone();
                    *existing = Item {
                        sold: true,
                        sold_at: sold.sold_at,
                        sold_to_name: sold.sold_to_name,
                        sold_to_email: sold.sold_to_email,
                        sold_session_id: sold.sold_session_id,
                        ..item
                    };
                }
                _ => {
                    items.insert(item.id.clone(), item);
                }
            }
            Ok(())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_reads() })
    }
}
