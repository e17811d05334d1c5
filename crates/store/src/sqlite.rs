//! SQLite backed change recorder

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use oracle_core::{
    HistoryEntry, LatestRecord, OracleReading, OracleStore, RecordOutcome, RetentionConfig,
    StoreError, StoreResult,
};

use crate::schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INSERT_UPDATE: &str = r#"
    INSERT INTO oracle_updates (oracle_name, price, updated_at, recorded_at, decimals, raw_price)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(oracle_name, updated_at) DO NOTHING
"#;

// The WHERE clause makes the upsert a no-op when the oracle timestamp is
// already the latest one; RETURNING then yields no row.
const UPSERT_LATEST: &str = r#"
    INSERT INTO oracle_latest
        (oracle_name, price, updated_at, recorded_at, decimals, raw_price, last_change_at, update_count)
    VALUES (?, ?, ?, ?, ?, ?, ?, 1)
    ON CONFLICT(oracle_name) DO UPDATE SET
        price = excluded.price,
        updated_at = excluded.updated_at,
        recorded_at = excluded.recorded_at,
        decimals = excluded.decimals,
        raw_price = excluded.raw_price,
        last_change_at = excluded.last_change_at,
        update_count = oracle_latest.update_count + 1
    WHERE oracle_latest.updated_at <> excluded.updated_at
    RETURNING update_count
"#;

const PRUNE_BY_COUNT: &str = r#"
    DELETE FROM oracle_updates WHERE id IN (
        SELECT id FROM (
            SELECT id, ROW_NUMBER() OVER (
                PARTITION BY oracle_name ORDER BY recorded_at DESC, id DESC
            ) AS rn
            FROM oracle_updates
        ) WHERE rn > ?
    )
"#;

/// Change recorder over a SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`.
    ///
    /// The schema is created on a dedicated connection first; the serving
    /// pool is built only afterwards.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::failure)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let mut conn = options.connect().await.map_err(StoreError::failure)?;
        schema::init(&mut conn).await.map_err(StoreError::failure)?;
        conn.close().await.map_err(StoreError::failure)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StoreError::failure)?;

        info!("Connected to oracle store at {}", url);
        Ok(Self { pool })
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(StoreError::failure)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StoreError::failure)?;

        let mut conn = pool.acquire().await.map_err(StoreError::failure)?;
        schema::init(&mut conn).await.map_err(StoreError::failure)?;
        drop(conn);

        Ok(Self { pool })
    }

    async fn record_change(&self, reading: &OracleReading, now: i64) -> Result<RecordOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(INSERT_UPDATE)
            .bind(&reading.name)
            .bind(reading.price)
            .bind(reading.updated_at)
            .bind(now)
            .bind(i64::from(reading.decimals))
            .bind(&reading.raw_price)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            debug!(
                oracle = %reading.name,
                updated_at = reading.updated_at,
                "timestamp already recorded"
            );
            return Ok(RecordOutcome::Unchanged);
        }

        let row = sqlx::query(UPSERT_LATEST)
            .bind(&reading.name)
            .bind(reading.price)
            .bind(reading.updated_at)
            .bind(now)
            .bind(i64::from(reading.decimals))
            .bind(&reading.raw_price)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        match row {
            Some(row) => {
                let update_count: i64 = row.try_get("update_count")?;
                tx.commit().await?;
                Ok(RecordOutcome::New {
                    update_count: update_count.max(0) as u64,
                })
            }
            None => {
                tx.rollback().await?;
                Ok(RecordOutcome::Unchanged)
            }
        }
    }
}

fn decimals_column(row: &SqliteRow) -> Result<u8, sqlx::Error> {
    let decimals: i64 = row.try_get("decimals")?;
    u8::try_from(decimals).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn history_from_row(row: &SqliteRow) -> Result<HistoryEntry, sqlx::Error> {
    Ok(HistoryEntry {
        id: row.try_get("id")?,
        oracle_name: row.try_get("oracle_name")?,
        price: row.try_get("price")?,
        updated_at: row.try_get("updated_at")?,
        recorded_at: row.try_get("recorded_at")?,
        decimals: decimals_column(row)?,
        raw_price: row.try_get("raw_price")?,
    })
}

fn latest_from_row(row: &SqliteRow) -> Result<LatestRecord, sqlx::Error> {
    let update_count: i64 = row.try_get("update_count")?;
    Ok(LatestRecord {
        oracle_name: row.try_get("oracle_name")?,
        price: row.try_get("price")?,
        updated_at: row.try_get("updated_at")?,
        recorded_at: row.try_get("recorded_at")?,
        decimals: decimals_column(row)?,
        raw_price: row.try_get("raw_price")?,
        last_change_at: row.try_get("last_change_at")?,
        update_count: update_count.max(0) as u64,
    })
}

#[async_trait]
impl OracleStore for SqliteStore {
    async fn record(&self, reading: &OracleReading, now: i64) -> StoreResult<RecordOutcome> {
        if reading.unsupported {
            return Ok(RecordOutcome::Unchanged);
        }

        let outcome = self
            .record_change(reading, now)
            .await
            .map_err(StoreError::failure)?;

        if let RecordOutcome::New { update_count } = outcome {
            debug!(
                oracle = %reading.name,
                updated_at = reading.updated_at,
                update_count,
                "recorded oracle update"
            );
        }
        Ok(outcome)
    }

    async fn latest(&self, oracle_name: &str) -> StoreResult<Option<LatestRecord>> {
        let row = sqlx::query("SELECT * FROM oracle_latest WHERE oracle_name = ?")
            .bind(oracle_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::failure)?;

        row.as_ref()
            .map(latest_from_row)
            .transpose()
            .map_err(StoreError::failure)
    }

    async fn latest_all(&self) -> StoreResult<Vec<LatestRecord>> {
        let rows = sqlx::query("SELECT * FROM oracle_latest ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::failure)?;

        rows.iter()
            .map(latest_from_row)
            .collect::<Result<_, _>>()
            .map_err(StoreError::failure)
    }

    async fn history(&self, oracle_name: &str, limit: u32) -> StoreResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM oracle_updates
            WHERE oracle_name = ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(oracle_name)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::failure)?;

        rows.iter()
            .map(history_from_row)
            .collect::<Result<_, _>>()
            .map_err(StoreError::failure)
    }

    async fn recent(&self, limit: u32) -> StoreResult<Vec<HistoryEntry>> {
        let rows = sqlx::query("SELECT * FROM oracle_updates ORDER BY recorded_at DESC, id DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::failure)?;

        rows.iter()
            .map(history_from_row)
            .collect::<Result<_, _>>()
            .map_err(StoreError::failure)
    }

    async fn prune(&self, policy: &RetentionConfig, now: i64) -> StoreResult<u64> {
        let mut removed = 0;

        if let Some(max_age) = policy.max_age_secs {
            let cutoff = now.saturating_sub(i64::try_from(max_age).unwrap_or(i64::MAX));
            removed += sqlx::query("DELETE FROM oracle_updates WHERE recorded_at < ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(StoreError::failure)?
                .rows_affected();
        }

        if let Some(max_entries) = policy.max_entries_per_oracle {
            removed += sqlx::query(PRUNE_BY_COUNT)
                .bind(i64::from(max_entries))
                .execute(&self.pool)
                .await
                .map_err(StoreError::failure)?
                .rows_affected();
        }

        if removed > 0 {
            info!("Pruned {} history rows", removed);
        }
        Ok(removed)
    }
}
