//! # Delegation Store
//!
//! Persistence for delegation records.
//!
//! The store is the exclusive owner of persisted rows. It exposes three
//! operations through the [`DelegationStore`] trait:
//! - idempotent, all-or-nothing bulk insert
//! - max-cursor lookup
//! - filtered, paginated reads ordered newest first
//!
//! ## Available Stores
//!
//! - [`SqliteStore`] - SQLite via `sqlx`, WAL journal, embedded migrations
//! - [`InMemoryStore`] - For tests and ephemeral runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use delegation_store::{DelegationStore, SqliteStore, StoreConfig};
//!
//! # async fn run() -> delegation_store::StoreResult<()> {
//! let store = SqliteStore::open(&StoreConfig::new("delegations.db")).await?;
//! let cursor = store.max_source_id().await?;
//! println!("resuming after {cursor}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod memory;
mod sqlite;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use store::DelegationStore;
