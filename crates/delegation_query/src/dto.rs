//! Response shapes for an external edge.
//!
//! Amounts and levels travel as decimal strings so that clients parsing
//! JSON numbers as doubles never lose precision.

use chrono::SecondsFormat;
use delegation_core::DelegationRecord;
use serde::{Deserialize, Serialize};

/// One delegation as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationDto {
    /// RFC 3339 UTC timestamp, second precision.
    pub timestamp: String,
    /// Delegated amount in mutez, as a decimal string.
    pub amount: String,
    /// Delegator address.
    pub delegator: String,
    /// Block level, as a decimal string.
    pub level: String,
}

impl From<&DelegationRecord> for DelegationDto {
    fn from(record: &DelegationRecord) -> Self {
        Self {
            timestamp: record.occurred_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            amount: record.amount.to_string(),
            delegator: record.delegator.clone(),
            level: record.block_level.to_string(),
        }
    }
}

/// A page of delegations, `{"data": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelegationsResponse {
    /// Records on the page, newest first.
    pub data: Vec<DelegationDto>,
}

impl DelegationsResponse {
    /// Maps stored records to their presented form.
    pub fn from_records(records: &[DelegationRecord]) -> Self {
        Self {
            data: records.iter().map(DelegationDto::from).collect(),
        }
    }
}

/// An error body, `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Message safe to show to a caller.
    pub error: String,
}

impl From<&crate::QueryError> for ErrorResponse {
    fn from(err: &crate::QueryError) -> Self {
        Self {
            error: err.public_message(),
        }
    }
}
