//! Store fixtures and record builders.
//!
//! Builders are deterministic: the same id always yields the same record,
//! and a larger id is never older than a smaller one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use delegation_core::DelegationRecord;
use delegation_store::{SqliteStore, StoreConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// A SQLite store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: SqliteStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Opens a migrated in-memory store.
    pub async fn memory() -> Self {
        let store = SqliteStore::open(&StoreConfig::in_memory())
            .await
            .expect("Failed to open in-memory store");
        Self {
            store,
            _temp_dir: None,
        }
    }

    /// Opens a migrated file-backed store in a fresh temporary directory.
    pub async fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("delegations.db");
        let store = SqliteStore::open(&StoreConfig::new(&path))
            .await
            .expect("Failed to open file store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir
            .as_ref()
            .map(|d| d.path().join("delegations.db"))
    }

    /// Returns a handle sharing the same connection pool.
    pub fn handle(&self) -> SqliteStore {
        self.store.clone()
    }
}

impl std::ops::Deref for TestStore {
    type Target = SqliteStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// First instant handed out by [`delegation`].
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
        .single()
        .expect("valid base time")
}

/// A tz1-style address unique to `id`.
pub fn delegator_address(id: i64) -> String {
    format!("tz1{:0>33}", id.unsigned_abs())
}

/// A valid record whose fields are all derived from `id`.
pub fn delegation(id: i64) -> DelegationRecord {
    delegation_at(id, base_time() + Duration::minutes(id))
}

/// A valid record for `id` occurring at `occurred_at`.
pub fn delegation_at(id: i64, occurred_at: DateTime<Utc>) -> DelegationRecord {
    DelegationRecord::new(id, occurred_at, id * 1_000, delegator_address(id), id + 100)
}

/// A valid record for `id` occurring within `year`.
pub fn delegation_in_year(id: i64, year: i32) -> DelegationRecord {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .expect("valid year");
    delegation_at(id, start + Duration::minutes(id % 100_000))
}

/// Records for every id in `ids`, built with [`delegation`].
pub fn delegations(ids: impl IntoIterator<Item = i64>) -> Vec<DelegationRecord> {
    ids.into_iter().map(delegation).collect()
}

/// Records for every id in `ids`, all within `year`.
pub fn delegations_in_year(ids: impl IntoIterator<Item = i64>, year: i32) -> Vec<DelegationRecord> {
    ids.into_iter().map(|id| delegation_in_year(id, year)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegation_store::DelegationStore;

    #[test]
    fn builders_are_valid_and_ordered() {
        let records = delegations(1..=50);
        for pair in records.windows(2) {
            assert!(pair[0].occurred_at < pair[1].occurred_at);
        }
        assert!(records.iter().all(|r| r.validate().is_ok()));
        assert_eq!(delegator_address(7).len(), 36);
    }

    #[test]
    fn year_builder_stays_in_year() {
        for record in delegations_in_year([1, 99_999, 250_000], 2019) {
            assert_eq!(record.year(), 2019);
        }
    }

    #[tokio::test]
    async fn memory_store_starts_empty() {
        let store = TestStore::memory().await;
        assert_eq!(store.max_source_id().await.unwrap(), 0);
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn file_store_has_path() {
        let store = TestStore::file().await;
        assert!(store.path().is_some());
        store.insert_batch(&delegations(1..=3)).await.unwrap();
        assert_eq!(store.count(None).await.unwrap(), 3);
    }
}
