//! Store trait definition.

use crate::error::StoreResult;
use async_trait::async_trait;
use delegation_core::{validate_year, DelegationRecord, ValidationError, ValidationResult};

/// Persistence capability consumed by the sync engine and the query service.
///
/// # Invariants
///
/// - `insert_batch` is all-or-nothing; a duplicate `source_id` is skipped,
///   never an error
/// - `max_source_id` never decreases across inserts and is 0 when empty
/// - `list_page` orders by `occurred_at` descending, then `block_level`
///   descending, then `source_id` descending
/// - Implementations must be `Send + Sync`; reads may run concurrently with
///   the single writer
#[async_trait]
pub trait DelegationStore: Send + Sync {
    /// Inserts a batch of records in one transaction.
    ///
    /// Returns the number of rows that were not already present. An empty
    /// batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the index of the first invalid
    /// record (nothing is written), or a database error if the transaction
    /// fails.
    async fn insert_batch(&self, records: &[DelegationRecord]) -> StoreResult<u64>;

    /// Returns the highest persisted `source_id`, or 0 on an empty store.
    async fn max_source_id(&self) -> StoreResult<i64>;

    /// Reads one page of records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NoRows`] when the (filtered) page is
    /// empty, and a validation error for a non-positive `limit`, a negative
    /// `offset` or a year before 2018.
    async fn list_page(
        &self,
        limit: i64,
        offset: i64,
        year: Option<i32>,
    ) -> StoreResult<Vec<DelegationRecord>>;

    /// Counts persisted records, optionally restricted to one year.
    async fn count(&self, year: Option<i32>) -> StoreResult<u64>;

    /// Checks that the store is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}

/// Validates every record of a batch before anything is written.
pub(crate) fn validate_batch(records: &[DelegationRecord]) -> ValidationResult<()> {
    for (index, record) in records.iter().enumerate() {
        record.validate().map_err(|err| {
            ValidationError::new(
                "delegation",
                format!(
                    "delegation at index {index} (source_id {}) is invalid: {}",
                    record.source_id, err.message
                ),
            )
        })?;
    }
    Ok(())
}

/// Validates `list_page` arguments.
pub(crate) fn validate_page_args(limit: i64, offset: i64, year: Option<i32>) -> ValidationResult<()> {
    if limit <= 0 {
        return Err(ValidationError::new(
            "limit",
            format!("must be positive, got {limit}"),
        ));
    }
    if offset < 0 {
        return Err(ValidationError::new(
            "offset",
            format!("must be non-negative, got {offset}"),
        ));
    }
    if let Some(year) = year {
        validate_year(year)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn page_args() {
        assert_eq!(validate_page_args(0, 0, None).unwrap_err().field, "limit");
        assert_eq!(validate_page_args(10, -1, None).unwrap_err().field, "offset");
        assert_eq!(validate_page_args(10, 0, Some(2010)).unwrap_err().field, "year");
        assert!(validate_page_args(10, 0, Some(2018)).is_ok());
    }

    #[test]
    fn batch_error_names_index() {
        let ts = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let records = vec![
            DelegationRecord::new(1, ts, 10, "tz1a", 1),
            DelegationRecord::new(2, ts, -10, "tz1b", 1),
        ];
        let err = validate_batch(&records).unwrap_err();
        assert_eq!(err.field, "delegation");
        assert!(err.message.contains("index 1"));
        assert!(err.message.contains("source_id 2"));
    }
}
