//! SQLite-backed store.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{validate_batch, validate_page_args, DelegationStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use delegation_core::DelegationRecord;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Rows per multi-row INSERT, keeping bind parameters under SQLite's limit.
const INSERT_CHUNK_ROWS: usize = 150;

const SELECT_COLUMNS: &str =
    "SELECT source_id, occurred_at, amount, delegator, block_level FROM delegations";

const ORDER_BY: &str = " ORDER BY occurred_at DESC, block_level DESC, source_id DESC";

/// A [`DelegationStore`] backed by SQLite.
///
/// The database runs in WAL mode so readers are not blocked by the single
/// writer. Cloning is cheap and shares the connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use delegation_store::{DelegationStore, SqliteStore, StoreConfig};
///
/// # async fn run() -> delegation_store::StoreResult<()> {
/// let store = SqliteStore::open(&StoreConfig::in_memory()).await?;
/// assert_eq!(store.max_source_id().await?, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database described by `config` and applies pending
    /// migrations.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        let pool = match &config.path {
            Some(path) => {
                if config.create_if_missing {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(config.create_if_missing)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .busy_timeout(config.busy_timeout);
                SqlitePoolOptions::new()
                    .max_connections(config.max_connections.max(1))
                    .connect_with(options)
                    .await
                    .map_err(|e| StoreError::database("open database", e))?
            }
            None => {
                // Every connection to `:memory:` is a separate database, so
                // pin exactly one connection for the lifetime of the pool.
                let options = SqliteConnectOptions::from_str("sqlite::memory:")
                    .map_err(|e| StoreError::database("open database", e))?
                    .busy_timeout(config.busy_timeout);
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>)
                    .connect_with(options)
                    .await
                    .map_err(|e| StoreError::database("open database", e))?
            }
        };

        MIGRATOR.run(&pool).await?;
        debug!(path = ?config.path, "delegation store opened");
        Ok(Self { pool })
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DelegationStore for SqliteStore {
    async fn insert_batch(&self, records: &[DelegationRecord]) -> StoreResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        validate_batch(records)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database("begin transaction", e))?;

        let mut inserted = 0u64;
        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "INSERT INTO delegations \
                 (source_id, occurred_at, occurred_year, amount, delegator, block_level) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.source_id)
                    .push_bind(format_timestamp(&record.occurred_at))
                    .push_bind(record.year())
                    .push_bind(record.amount)
                    .push_bind(record.delegator.as_str())
                    .push_bind(record.block_level);
            });
            builder.push(" ON CONFLICT(source_id) DO NOTHING");

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::database("insert delegations", e))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::database("commit transaction", e))?;

        debug!(
            batch = records.len(),
            inserted,
            skipped = records.len() as u64 - inserted,
            "inserted delegation batch"
        );
        Ok(inserted)
    }

    async fn max_source_id(&self) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(source_id), 0) FROM delegations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database("query latest source id", e))
    }

    async fn list_page(
        &self,
        limit: i64,
        offset: i64,
        year: Option<i32>,
    ) -> StoreResult<Vec<DelegationRecord>> {
        validate_page_args(limit, offset, year)?;

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        if let Some(year) = year {
            builder.push(" WHERE occurred_year = ").push_bind(year);
        }
        builder.push(ORDER_BY);
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("query delegations", e))?;

        if rows.is_empty() {
            return Err(StoreError::NoRows);
        }
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self, year: Option<i32>) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM delegations");
        if let Some(year) = year {
            builder.push(" WHERE occurred_year = ").push_bind(year);
        }
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database("count delegations", e))?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("health check", e))?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so that lexical order matches chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &SqliteRow) -> StoreResult<DelegationRecord> {
    let decode = |e: sqlx::Error| StoreError::database("decode delegation row", e);
    let source_id: i64 = row.try_get("source_id").map_err(decode)?;
    let occurred_at: String = row.try_get("occurred_at").map_err(decode)?;
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_at)
        .map_err(|e| {
            StoreError::Corrupted(format!(
                "delegation {source_id} has invalid timestamp {occurred_at:?}: {e}"
            ))
        })?
        .with_timezone(&Utc);

    Ok(DelegationRecord {
        source_id,
        occurred_at,
        amount: row.try_get("amount").map_err(decode)?,
        delegator: row.try_get("delegator").map_err(decode)?,
        block_level: row.try_get("block_level").map_err(decode)?,
    })
}
