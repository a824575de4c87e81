//! # Delegation Sync Engine
//!
//! Pulls append-only delegation records from an upstream HTTP feed and
//! persists them through a [`delegation_store::DelegationStore`].
//!
//! This crate provides:
//! - The [`DelegationFeed`] capability and its HTTP implementation,
//!   [`TzktClient`], which owns retry, backoff and rate-limit handling
//! - The [`SyncEngine`] state machine (historical sync, then steady polling)
//! - The [`Poller`], which runs one engine on a background task with
//!   cooperative cancellation and a bounded join
//!
//! ## Architecture
//!
//! Each sync cycle:
//! 1. Reads the highest ingested `source_id` from the store
//! 2. Fetches the next page of records strictly beyond it
//! 3. Inserts the page (idempotently)
//! 4. Reports caught-up when the page was not full
//!
//! ## Key Invariants
//!
//! - The engine is the only writer
//! - The cursor is derived from the store, never kept in memory
//! - Re-delivered records are ignored by the store
//! - Cancellation is observed by every wait

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod feed;
mod http;
mod poller;
mod state;
mod wait;

pub use config::{RetryConfig, SyncConfig, DEFAULT_FEED_URL};
pub use error::{SyncError, SyncResult};
pub use feed::{DelegationFeed, MockFeed};
pub use http::TzktClient;
pub use poller::{Poller, DEFAULT_SHUTDOWN_TIMEOUT};
pub use state::{SyncCycleResult, SyncEngine, SyncState, SyncStats};
pub use tokio_util::sync::CancellationToken;
