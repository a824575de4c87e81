//! CLI command implementations.

pub mod query;
pub mod run;
pub mod status;
pub mod sync_once;

use delegation_store::{SqliteStore, StoreConfig, StoreResult};
use std::path::Path;

/// Opens (creating and migrating if needed) the store at `path`.
pub async fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::open(&StoreConfig::new(path)).await
}

/// Opens the store at `path`, failing if it does not exist yet.
pub async fn open_existing_store(path: &Path) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No database found at {}", path.display()).into());
    }
    Ok(SqliteStore::open(&StoreConfig::new(path).with_create_if_missing(false)).await?)
}
