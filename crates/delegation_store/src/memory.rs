//! In-memory store for testing.

use crate::error::{StoreError, StoreResult};
use crate::store::{validate_batch, validate_page_args, DelegationStore};
use async_trait::async_trait;
use delegation_core::DelegationRecord;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory [`DelegationStore`].
///
/// Records are keyed by `source_id`, which gives the same idempotence as the
/// SQL unique constraint. Clones share state, so a test can hand one clone to
/// the engine and inspect another.
///
/// # Example
///
/// ```rust
/// use delegation_store::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<BTreeMap<i64, DelegationRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// All records in ascending `source_id` order.
    pub fn records(&self) -> Vec<DelegationRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Simulates an outage: while set, every operation fails with a database
    /// error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self, operation: &'static str) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::database(operation, sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DelegationStore for InMemoryStore {
    async fn insert_batch(&self, records: &[DelegationRecord]) -> StoreResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        validate_batch(records)?;
        self.check_available("insert delegations")?;

        let mut stored = self.records.write();
        let mut inserted = 0;
        for record in records {
            if !stored.contains_key(&record.source_id) {
                stored.insert(record.source_id, record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn max_source_id(&self) -> StoreResult<i64> {
        self.check_available("query latest source id")?;
        Ok(self.records.read().keys().next_back().copied().unwrap_or(0))
    }

    async fn list_page(
        &self,
        limit: i64,
        offset: i64,
        year: Option<i32>,
    ) -> StoreResult<Vec<DelegationRecord>> {
        validate_page_args(limit, offset, year)?;
        self.check_available("query delegations")?;

        let mut matching: Vec<DelegationRecord> = self
            .records
            .read()
            .values()
            .filter(|r| year.is_none_or(|y| r.year() == y))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(b.block_level.cmp(&a.block_level))
                .then(b.source_id.cmp(&a.source_id))
        });

        let page: Vec<DelegationRecord> = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        if page.is_empty() {
            return Err(StoreError::NoRows);
        }
        Ok(page)
    }

    async fn count(&self, year: Option<i32>) -> StoreResult<u64> {
        self.check_available("count delegations")?;
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| year.is_none_or(|y| r.year() == y))
            .count() as u64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.check_available("health check")
    }
}
