//! Status command implementation.

use super::open_existing_store;
use delegation_query::DelegationDto;
use delegation_store::{DelegationStore, StoreError, StoreResult};
use serde::Serialize;
use std::path::Path;

/// Store statistics.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Database path.
    pub path: String,
    /// Number of stored delegations.
    pub records: u64,
    /// Highest stored `source_id`; the next fetch starts after it.
    pub cursor: i64,
    /// Timestamp of the newest delegation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<String>,
}

/// Collects statistics from an open store.
pub async fn collect<S: DelegationStore>(path: &Path, store: &S) -> StoreResult<StatusResult> {
    store.health_check().await?;
    let newest = match store.list_page(1, 0, None).await {
        Ok(records) => records.first().map(|r| DelegationDto::from(r).timestamp),
        Err(StoreError::NoRows) => None,
        Err(e) => return Err(e),
    };
    Ok(StatusResult {
        path: path.display().to_string(),
        records: store.count(None).await?,
        cursor: store.max_source_id().await?,
        newest,
    })
}

/// Runs the status command.
pub async fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing_store(path).await?;
    let result = collect(path, &store).await;
    store.close().await;
    let result = result?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &StatusResult) {
    println!("Delegation Store Status");
    println!("=======================");
    println!("Path:    {}", result.path);
    println!("Records: {}", result.records);
    println!("Cursor:  {}", result.cursor);
    println!(
        "Newest:  {}",
        result.newest.as_deref().unwrap_or("(none)")
    );
}
