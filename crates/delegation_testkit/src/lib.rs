//! # Delegation Testkit
//!
//! Test utilities for the delegation sync workspace.
//!
//! This crate provides:
//! - Store fixtures backed by temporary SQLite databases
//! - Deterministic delegation record builders
//! - A paged mock of the upstream feed built on wiremock
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use delegation_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn ingests_everything() {
//!     let store = TestStore::memory().await;
//!     let feed = FeedServer::start(delegations(1..=10)).await;
//!     // ... point a client at feed.url()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod feed_server;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::feed_server::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use feed_server::*;
pub use fixtures::*;
pub use generators::*;
