//! Persistence seam for the change recorder

use async_trait::async_trait;

use crate::{HistoryEntry, LatestRecord, OracleReading, RecordOutcome, RetentionConfig, StoreResult};

/// Default row limit for history queries
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Upper bound accepted from callers
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// Durable oracle history and per-oracle statistics
#[async_trait]
pub trait OracleStore: Send + Sync {
    /// Record `reading` observed at wall-clock `now`.
    ///
    /// Writes only when `reading.updated_at` differs from the latest
    /// recorded value for the oracle. Concurrent calls for the same
    /// reading write at most once.
    async fn record(&self, reading: &OracleReading, now: i64) -> StoreResult<RecordOutcome>;

    async fn latest(&self, oracle_name: &str) -> StoreResult<Option<LatestRecord>>;

    async fn latest_all(&self) -> StoreResult<Vec<LatestRecord>>;

    /// History of one oracle, newest recording first
    async fn history(&self, oracle_name: &str, limit: u32) -> StoreResult<Vec<HistoryEntry>>;

    /// Most recent history across all oracles, newest recording first
    async fn recent(&self, limit: u32) -> StoreResult<Vec<HistoryEntry>>;

    /// Apply a retention policy; returns the number of rows removed
    async fn prune(&self, policy: &RetentionConfig, now: i64) -> StoreResult<u64>;
}
