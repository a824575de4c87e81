//! Delegation records and the ingestion cursor.

use crate::error::{ValidationError, ValidationResult};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of records the upstream feed returns per request.
pub const FEED_PAGE_SIZE: usize = 1000;

/// A delegation operation ingested from the upstream feed.
///
/// Records are append-only: once persisted, no field changes. The
/// `source_id` is issued upstream, is strictly increasing and doubles as the
/// ingestion cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    /// Upstream operation id (unique, sort key).
    pub source_id: i64,
    /// When the operation was included on chain.
    pub occurred_at: DateTime<Utc>,
    /// Delegated balance in mutez.
    pub amount: i64,
    /// Address of the delegating account.
    pub delegator: String,
    /// Block level containing the operation.
    pub block_level: i64,
}

impl DelegationRecord {
    /// Creates a new record.
    pub fn new(
        source_id: i64,
        occurred_at: DateTime<Utc>,
        amount: i64,
        delegator: impl Into<String>,
        block_level: i64,
    ) -> Self {
        Self {
            source_id,
            occurred_at,
            amount,
            delegator: delegator.into(),
            block_level,
        }
    }

    /// Calendar year of `occurred_at`, in UTC.
    pub fn year(&self) -> i32 {
        self.occurred_at.year()
    }

    /// Checks the field-level invariants a record must satisfy before it can
    /// be stored.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.source_id <= 0 {
            return Err(ValidationError::new(
                "source_id",
                format!("must be positive, got {}", self.source_id),
            ));
        }
        if self.amount < 0 {
            return Err(ValidationError::new(
                "amount",
                format!("must be non-negative, got {}", self.amount),
            ));
        }
        if self.block_level < 0 {
            return Err(ValidationError::new(
                "block_level",
                format!("must be non-negative, got {}", self.block_level),
            ));
        }
        if self.delegator.trim().is_empty() {
            return Err(ValidationError::new("delegator", "must not be empty"));
        }
        Ok(())
    }
}

/// Highest `source_id` persisted so far.
///
/// Derived from the store on demand; [`Cursor::NONE`] means nothing has been
/// ingested yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(i64);

impl Cursor {
    /// Cursor of an empty store.
    pub const NONE: Cursor = Cursor(0);

    /// Creates a cursor at the given upstream id.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw upstream id.
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns true if nothing has been ingested yet.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for Cursor {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
