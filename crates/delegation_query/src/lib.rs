//! # Delegation Query
//!
//! Read-only, paginated access to stored delegations.
//!
//! This crate provides:
//! - [`QueryService`], which turns page/size/year input into store reads
//! - The response shapes handed to an external edge ([`DelegationDto`],
//!   [`DelegationsResponse`], [`ErrorResponse`])
//! - [`QueryError`] with its status classification
//!
//! ## Key Invariants
//!
//! - The service never writes
//! - An empty result is success, never an error
//! - Database failures never expose internal detail through
//!   [`QueryError::public_message`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dto;
mod error;
mod service;

pub use dto::{DelegationDto, DelegationsResponse, ErrorResponse};
pub use error::{QueryError, QueryResult};
pub use service::QueryService;
