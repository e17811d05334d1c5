//! Oracle aggregator - drives poll cycles per asset

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use oracle_core::{unix_now, AppConfig, Asset, FeedSpec, OracleStore, RetentionConfig};

use crate::poller::{CycleRunner, CycleSnapshot};
use crate::reader::FeedReader;
use crate::state::SnapshotState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("Aggregator already running")]
    AlreadyRunning,

    #[error("No assets configured")]
    NoAssets,
}

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub assets: Vec<Asset>,
    pub poll_interval: Duration,
    pub stale_after_secs: i64,
    pub retention: RetentionConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            assets: Asset::ALL.to_vec(),
            poll_interval: Duration::from_secs(1),
            stale_after_secs: oracle_core::DEFAULT_STALE_AFTER_SECS,
            retention: RetentionConfig::default(),
        }
    }
}

impl From<&AppConfig> for AggregatorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            assets: config.poll.assets.clone(),
            poll_interval: config.poll.interval(),
            stale_after_secs: config.poll.stale_after_secs,
            retention: config.retention.clone(),
        }
    }
}

/// Main oracle aggregator
pub struct OracleAggregator {
    config: AggregatorConfig,
    runner: Arc<CycleRunner>,
    state: Arc<SnapshotState>,
    sequences: Arc<DashMap<Asset, AtomicU64>>,
    handles: Vec<JoinHandle<()>>,
    running: Arc<RwLock<bool>>,
}

impl OracleAggregator {
    pub fn new(
        config: AggregatorConfig,
        reader: Arc<dyn FeedReader>,
        store: Option<Arc<dyn OracleStore>>,
    ) -> Self {
        let runner = CycleRunner::new(reader, store).with_stale_after(config.stale_after_secs);

        Self {
            config,
            runner: Arc::new(runner),
            state: Arc::new(SnapshotState::new()),
            sequences: Arc::new(DashMap::new()),
            handles: vec![],
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Get shared state reference
    pub fn state(&self) -> Arc<SnapshotState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Start one cycle driver per asset, plus history retention
    pub async fn start(&mut self) -> Result<(), AggregatorError> {
        if self.config.assets.is_empty() {
            return Err(AggregatorError::NoAssets);
        }

        let mut running = self.running.write().await;
        if *running {
            return Err(AggregatorError::AlreadyRunning);
        }
        *running = true;
        drop(running);

        info!(
            "Starting oracle aggregator: {:?} every {:?}",
            self.config.assets, self.config.poll_interval
        );

        for &asset in &self.config.assets {
            let handle = tokio::spawn(drive_asset(
                asset,
                self.config.poll_interval,
                Arc::clone(&self.runner),
                Arc::clone(&self.state),
                Arc::clone(&self.sequences),
                Arc::clone(&self.running),
            ));
            self.handles.push(handle);
            info!("Started {} cycle driver", asset);
        }

        match self.runner.store() {
            Some(store) if self.config.retention.is_enabled() => {
                let handle = tokio::spawn(run_retention(
                    Arc::clone(store),
                    self.config.retention.clone(),
                    Arc::clone(&self.running),
                ));
                self.handles.push(handle);
            }
            Some(_) => info!("History retention disabled"),
            None => warn!("No store configured, oracle changes will not be recorded"),
        }

        Ok(())
    }

    /// Stop all drivers along with their in-flight cycles
    pub async fn stop(&mut self) {
        info!("Stopping oracle aggregator");
        *self.running.write().await = false;

        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Check if running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run a cycle for `asset` right away and publish it
    pub async fn poll_now(&self, asset: Asset) -> CycleSnapshot {
        let sequence = next_sequence(&self.sequences, asset);
        let snapshot = self.runner.run(asset, sequence).await;
        publish(&self.state, snapshot.clone());
        snapshot
    }

    /// Same as [`poll_now`](Self::poll_now) over an explicit feed list
    pub async fn poll_feeds_now(&self, asset: Asset, feeds: &[FeedSpec]) -> CycleSnapshot {
        let sequence = next_sequence(&self.sequences, asset);
        let snapshot = self.runner.run_feeds(asset, feeds, sequence).await;
        publish(&self.state, snapshot.clone());
        snapshot
    }

    /// Get statistics
    pub fn stats(&self) -> AggregatorStats {
        let state_stats = self.state.stats();

        AggregatorStats {
            task_count: self.handles.len(),
            asset_count: state_stats.asset_count,
            cycles_published: state_stats.published,
            cycles_failed: state_stats.failed,
            cycles_superseded: state_stats.superseded,
        }
    }
}

/// Aggregator statistics
#[derive(Debug, Clone)]
pub struct AggregatorStats {
    pub task_count: usize,
    pub asset_count: usize,
    pub cycles_published: u64,
    pub cycles_failed: u64,
    pub cycles_superseded: u64,
}

fn next_sequence(sequences: &DashMap<Asset, AtomicU64>, asset: Asset) -> u64 {
    sequences
        .entry(asset)
        .or_default()
        .fetch_add(1, Ordering::Relaxed)
        + 1
}

fn publish(state: &SnapshotState, snapshot: CycleSnapshot) {
    let asset = snapshot.asset;
    let sequence = snapshot.sequence;

    if let Err(e) = &snapshot.outcome {
        error!("{} cycle {} failed: {}", asset, sequence, e);
    }

    if !state.publish(snapshot) {
        debug!("{} cycle {} superseded by a newer cycle", asset, sequence);
    }
}

/// Tick every `poll_interval` and run each cycle as its own task.
///
/// A slow cycle does not delay the next tick; ordering of published
/// results comes from the sequence number. In-flight cycles belong to the
/// driver's `JoinSet` and are aborted with it.
async fn drive_asset(
    asset: Asset,
    poll_interval: Duration,
    runner: Arc<CycleRunner>,
    state: Arc<SnapshotState>,
    sequences: Arc<DashMap<Asset, AtomicU64>>,
    running: Arc<RwLock<bool>>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !*running.read().await {
                    break;
                }

                let sequence = next_sequence(&sequences, asset);
                let runner = Arc::clone(&runner);
                let state = Arc::clone(&state);
                let running = Arc::clone(&running);

                cycles.spawn(async move {
                    let snapshot = runner.run(asset, sequence).await;
                    // Held across publish so nothing lands once stop() has flipped the flag
                    let running = running.read().await;
                    if *running {
                        publish(&state, snapshot);
                    }
                });
            }
            Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!("{} cycle panicked: {}", asset, e);
                    }
                }
            }
        }
    }

    cycles.shutdown().await;
}

async fn run_retention(
    store: Arc<dyn OracleStore>,
    policy: RetentionConfig,
    running: Arc<RwLock<bool>>,
) {
    let mut interval = tokio::time::interval(policy.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if !*running.read().await {
            break;
        }

        match store.prune(&policy, unix_now()).await {
            Ok(removed) => debug!("Retention pass removed {} rows", removed),
            Err(e) => warn!("Retention pass failed: {}", e),
        }
    }
}
