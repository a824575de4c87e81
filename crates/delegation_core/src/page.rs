//! Pagination requests for the read surface.

use crate::error::{ValidationError, ValidationResult};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Earliest year accepted by the year filter.
pub const MIN_YEAR: i32 = 2018;

/// A validated request for one page of delegations.
///
/// Transient: built per call and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: i64,
    page_size: i64,
    year: Option<i32>,
}

impl PageRequest {
    /// Builds a request, rejecting a page number below 1.
    pub fn new(page_number: i64, page_size: i64, year: Option<i32>) -> ValidationResult<Self> {
        if page_number < 1 {
            return Err(ValidationError::new(
                "page",
                format!("must be a positive integer, got {page_number}"),
            ));
        }
        Self::lenient(page_number, page_size, year)
    }

    /// Builds a request, treating a page number below 1 as the first page.
    pub fn lenient(page_number: i64, page_size: i64, year: Option<i32>) -> ValidationResult<Self> {
        validate_page_size(page_size)?;
        if let Some(year) = year {
            validate_year(year)?;
        }
        Ok(Self {
            page_number: page_number.max(1),
            page_size,
            year,
        })
    }

    /// 1-based page number.
    pub fn page_number(&self) -> i64 {
        self.page_number
    }

    /// Number of records per page; also the query limit.
    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Optional calendar-year filter.
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Number of records to skip: `(page_number - 1) * page_size`.
    pub fn offset(&self) -> ValidationResult<i64> {
        (self.page_number - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| {
                ValidationError::new(
                    "page",
                    format!("page {} is out of range", self.page_number),
                )
            })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            year: None,
        }
    }
}

/// Checks that a page size lies in `1..=MAX_PAGE_SIZE`.
pub(crate) fn validate_page_size(page_size: i64) -> ValidationResult<()> {
    if page_size < 1 {
        return Err(ValidationError::new(
            "pageSize",
            format!("must be positive, got {page_size}"),
        ));
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::new(
            "pageSize",
            format!("cannot exceed {MAX_PAGE_SIZE}, got {page_size}"),
        ));
    }
    Ok(())
}

/// Checks that a year filter is not earlier than [`MIN_YEAR`].
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if year < MIN_YEAR {
        return Err(ValidationError::new(
            "year",
            format!("must be a valid year from {MIN_YEAR} onwards, got {year}"),
        ));
    }
    Ok(())
}
