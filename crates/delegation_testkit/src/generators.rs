//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random delegation records that
//! satisfy record validation.

use chrono::{DateTime, TimeZone, Utc};
use delegation_core::{DelegationRecord, MIN_YEAR};
use proptest::prelude::*;

/// Last year produced by [`year_strategy`] and [`timestamp_strategy`].
pub const MAX_GENERATED_YEAR: i32 = 2025;

/// Strategy for generating tz-style delegator addresses.
pub fn delegator_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("tz[123][1-9A-HJ-NP-Za-km-z]{33}").expect("Invalid regex")
}

/// Strategy for generating years accepted by the query layer.
pub fn year_strategy() -> impl Strategy<Value = i32> {
    MIN_YEAR..=MAX_GENERATED_YEAR
}

/// Strategy for generating whole-second timestamps between 2018 and 2025.
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    let start = Utc
        .with_ymd_and_hms(MIN_YEAR, 1, 1, 0, 0, 0)
        .single()
        .expect("valid start")
        .timestamp();
    let end = Utc
        .with_ymd_and_hms(MAX_GENERATED_YEAR, 12, 31, 23, 59, 59)
        .single()
        .expect("valid end")
        .timestamp();
    (start..=end).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .expect("timestamp in range")
    })
}

/// Strategy for generating a valid record with an id in `1..max_id`.
pub fn delegation_strategy(max_id: i64) -> impl Strategy<Value = DelegationRecord> {
    (
        1..max_id.max(2),
        timestamp_strategy(),
        0i64..1_000_000_000_000,
        delegator_strategy(),
        0i64..10_000_000,
    )
        .prop_map(|(id, at, amount, delegator, level)| {
            DelegationRecord::new(id, at, amount, delegator, level)
        })
}

/// Strategy for generating batches of valid records with distinct ids.
pub fn delegation_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<DelegationRecord>> {
    prop::collection::btree_map(1i64..1_000_000, delegation_strategy(2), 0..=max_len).prop_map(
        |by_id| {
            by_id
                .into_iter()
                .map(|(id, mut record)| {
                    record.source_id = id;
                    record
                })
                .collect()
        },
    )
}
