//! Query command implementation.

use super::open_existing_store;
use delegation_core::PageRequest;
use delegation_query::{DelegationsResponse, ErrorResponse, QueryError, QueryService};
use delegation_store::DelegationStore;
use std::path::Path;

/// Reads one page through the query service.
///
/// Page numbers are validated strictly here: a page below 1 is an error
/// rather than being clamped.
pub async fn fetch<S: DelegationStore>(
    service: &QueryService<S>,
    page: i64,
    page_size: i64,
    year: Option<i32>,
) -> Result<DelegationsResponse, QueryError> {
    let request = PageRequest::new(page, page_size, year)?;
    let records = service.fetch(&request).await?;
    Ok(DelegationsResponse::from_records(&records))
}

/// Runs the query command.
pub async fn run(
    path: &Path,
    page: i64,
    page_size: i64,
    year: Option<i32>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing_store(path).await?;
    let service = QueryService::new(store.clone());

    let response = match fetch(&service, page, page_size, year).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&ErrorResponse::from(&e))?);
            store.close().await;
            return Err(e.into());
        }
    };
    store.close().await;

    match format {
        "text" => print_text_output(&response),
        _ => println!("{}", serde_json::to_string_pretty(&response)?),
    }
    Ok(())
}

fn print_text_output(response: &DelegationsResponse) {
    if response.data.is_empty() {
        println!("No delegations found");
        return;
    }
    println!("{:<20}  {:>12}  {:>20}  DELEGATOR", "TIMESTAMP", "LEVEL", "AMOUNT");
    for dto in &response.data {
        println!(
            "{:<20}  {:>12}  {:>20}  {}",
            dto.timestamp, dto.level, dto.amount, dto.delegator
        );
    }
}
