//! # Delegation Core
//!
//! Shared data model for the delegation sync workspace.
//!
//! This crate provides:
//! - [`DelegationRecord`], the immutable record ingested from the upstream feed
//! - [`Cursor`], the highest ingested upstream id
//! - [`PageRequest`], a validated pagination request
//! - [`ValidationError`], the input-validation error shared by the store and
//!   the query service
//!
//! ## Key Invariants
//!
//! - `source_id` uniquely identifies a record
//! - Records are never mutated once stored
//! - The cursor never moves backwards

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod page;
mod record;

pub use error::{ValidationError, ValidationResult};
pub use page::{validate_year, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_YEAR};
pub use record::{Cursor, DelegationRecord, FEED_PAGE_SIZE};
