//! Paginated reads.

use crate::dto::DelegationsResponse;
use crate::error::{QueryError, QueryResult};
use delegation_core::{DelegationRecord, PageRequest};
use delegation_store::{DelegationStore, StoreError};
use std::sync::Arc;
use tracing::{debug, error};

/// Serves pages of delegations, newest first.
///
/// Cloning is cheap; clones share the store.
pub struct QueryService<S: DelegationStore> {
    store: Arc<S>,
}

impl<S: DelegationStore> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DelegationStore> QueryService<S> {
    /// Creates a service reading from `store`.
    pub fn new(store: S) -> Self {
        Self::with_shared(Arc::new(store))
    }

    /// Creates a service reading from a shared store.
    pub fn with_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Gets the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns one page of records.
    ///
    /// A page number below 1 is treated as 1. The page size must be within
    /// 1..=1000 and the year, when given, at least 2018.
    pub async fn get_page(
        &self,
        page_number: i64,
        page_size: i64,
        year: Option<i32>,
    ) -> QueryResult<Vec<DelegationRecord>> {
        let request = PageRequest::lenient(page_number, page_size, year)?;
        self.fetch(&request).await
    }

    /// Returns the page described by an already validated request.
    pub async fn fetch(&self, request: &PageRequest) -> QueryResult<Vec<DelegationRecord>> {
        let offset = request.offset()?;
        match self
            .store
            .list_page(request.page_size(), offset, request.year())
            .await
        {
            Ok(records) => Ok(records),
            Err(StoreError::NoRows) => {
                debug!(
                    page = request.page_number(),
                    page_size = request.page_size(),
                    year = ?request.year(),
                    "no delegations match"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                let err = QueryError::from(e);
                if !err.is_validation() {
                    error!(error = %err, "failed to read delegations");
                }
                Err(err)
            }
        }
    }

    /// Like [`QueryService::get_page`], mapped to the response shape.
    pub async fn get_page_dto(
        &self,
        page_number: i64,
        page_size: i64,
        year: Option<i32>,
    ) -> QueryResult<DelegationsResponse> {
        let records = self.get_page(page_number, page_size, year).await?;
        Ok(DelegationsResponse::from_records(&records))
    }
}
