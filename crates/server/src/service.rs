//! Service layer shared by the HTTP handlers

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use oracle_core::{
    AggregateView, Asset, CycleError, HistoryEntry, OracleStore, StoreError, StoreResult,
    DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
use oracle_price_feed::{AggregatorError, CycleSnapshot, OracleAggregator, SnapshotState};

use crate::responses::{AssetHealth, HealthResponse, HealthStatus, StorageStatus};

/// Why an aggregate view cannot be served
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("{0} is not polled by this instance")]
    NotConfigured(Asset),

    #[error("No completed {0} cycle yet")]
    NotReady(Asset),

    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// History rows selected by a query
#[derive(Debug, Clone, PartialEq)]
pub enum History {
    Oracle {
        oracle: String,
        entries: Vec<HistoryEntry>,
    },
    Recent(Vec<HistoryEntry>),
}

struct ServiceInner {
    state: Arc<SnapshotState>,
    store: Option<Arc<dyn OracleStore>>,
    assets: Vec<Asset>,
    aggregator: Mutex<OracleAggregator>,
    start_time: Instant,
}

/// Cheaply cloneable handle over the aggregator, its state and the store
#[derive(Clone)]
pub struct OracleService {
    inner: Arc<ServiceInner>,
}

impl OracleService {
    pub fn new(aggregator: OracleAggregator, store: Option<Arc<dyn OracleStore>>) -> Self {
        let inner = ServiceInner {
            state: aggregator.state(),
            store,
            assets: aggregator.config().assets.clone(),
            aggregator: Mutex::new(aggregator),
            start_time: Instant::now(),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Start background polling
    pub async fn start(&self) -> Result<(), AggregatorError> {
        self.inner.aggregator.lock().await.start().await?;
        info!("Oracle aggregator started");
        Ok(())
    }

    pub async fn stop(&self) {
        self.inner.aggregator.lock().await.stop().await;
        info!("All services stopped");
    }

    /// Run a cycle outside the poll schedule
    pub async fn poll_now(&self, asset: Asset) -> CycleSnapshot {
        self.inner.aggregator.lock().await.poll_now(asset).await
    }

    pub fn has_store(&self) -> bool {
        self.inner.store.is_some()
    }

    /// Latest published view for `asset`
    pub fn view(&self, asset: Asset) -> Result<AggregateView, ViewError> {
        if !self.inner.assets.contains(&asset) {
            return Err(ViewError::NotConfigured(asset));
        }

        let snapshot = self
            .inner
            .state
            .get(asset)
            .ok_or(ViewError::NotReady(asset))?;

        snapshot.outcome.map_err(ViewError::from)
    }

    /// History of `oracle`, or recent updates across all oracles when `None`.
    ///
    /// `limit` defaults to [`DEFAULT_HISTORY_LIMIT`] and is clamped to
    /// `1..=MAX_HISTORY_LIMIT`.
    pub async fn history(&self, oracle: Option<&str>, limit: Option<u32>) -> StoreResult<History> {
        let store = self.inner.store.as_ref().ok_or(StoreError::Unavailable)?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        match oracle {
            Some(name) => Ok(History::Oracle {
                oracle: name.to_string(),
                entries: store.history(name, limit).await?,
            }),
            None => Ok(History::Recent(store.recent(limit).await?)),
        }
    }

    pub fn health(&self) -> HealthResponse {
        let assets: Vec<AssetHealth> = self
            .inner
            .assets
            .iter()
            .map(|&asset| asset_health(asset, self.inner.state.get(asset)))
            .collect();

        let status = if assets.iter().any(|a| a.error.is_some()) {
            HealthStatus::Degraded
        } else if assets.iter().any(|a| a.last_cycle.is_none()) {
            HealthStatus::Starting
        } else {
            HealthStatus::Ok
        };

        HealthResponse {
            status,
            storage: if self.has_store() {
                StorageStatus::Sqlite
            } else {
                StorageStatus::Disabled
            },
            uptime_secs: self.inner.start_time.elapsed().as_secs(),
            assets,
        }
    }
}

fn asset_health(asset: Asset, snapshot: Option<CycleSnapshot>) -> AssetHealth {
    let mut health = AssetHealth {
        asset,
        pair: asset.pair().to_string(),
        last_cycle: None,
        completed_at: None,
        oracle_count: 0,
        failure_count: 0,
        error: None,
    };

    if let Some(snapshot) = snapshot {
        health.last_cycle = Some(snapshot.sequence);
        health.completed_at = Some(snapshot.completed_at);
        match snapshot.outcome {
            Ok(view) => {
                health.oracle_count = view.oracles.len();
                health.failure_count = view.failures.len();
            }
            Err(e) => health.error = Some(e.to_string()),
        }
    }

    health
}
