//! One poll cycle: read, normalize, record, rank
//!
//! Every feed of an asset is read concurrently and each outcome is kept on
//! its own, so one unavailable feed only removes that oracle from the
//! cycle. Recording and statistics are best-effort: a store failure is
//! logged and the view is served with defaulted stats.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use oracle_core::{
    feeds_for, normalize_feed, rank, stats_map, unix_now, AggregateView, Asset, CycleError,
    FeedFailure, FeedResult, FeedSpec, OracleReading, OracleStore, StatsMap,
    DEFAULT_STALE_AFTER_SECS,
};

use crate::reader::{source_address, FeedReader};

/// Result of polling a single feed
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub spec: FeedSpec,
    pub result: FeedResult<OracleReading>,
}

/// Published result of a cycle
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    pub asset: Asset,
    /// Per-asset cycle number, increasing in start order
    pub sequence: u64,
    pub completed_at: i64,
    pub outcome: Result<AggregateView, CycleError>,
}

/// Read every feed in `feeds` concurrently, preserving input order
pub async fn poll_feeds(reader: &dyn FeedReader, feeds: &[FeedSpec]) -> Vec<FeedOutcome> {
    join_all(feeds.iter().map(|spec| poll_feed(reader, spec))).await
}

async fn poll_feed(reader: &dyn FeedReader, spec: &FeedSpec) -> FeedOutcome {
    let result = if spec.is_supported() {
        reader
            .read(spec)
            .await
            .and_then(|raw| normalize_feed(spec, &raw))
    } else {
        Ok(OracleReading::unsupported(spec.name()))
    };

    FeedOutcome {
        spec: *spec,
        result,
    }
}

/// Runs poll cycles against a reader and an optional store
pub struct CycleRunner {
    reader: Arc<dyn FeedReader>,
    store: Option<Arc<dyn OracleStore>>,
    stale_after_secs: i64,
}

impl CycleRunner {
    pub fn new(reader: Arc<dyn FeedReader>, store: Option<Arc<dyn OracleStore>>) -> Self {
        Self {
            reader,
            store,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
        }
    }

    pub fn with_stale_after(mut self, secs: i64) -> Self {
        self.stale_after_secs = secs;
        self
    }

    pub fn store(&self) -> Option<&Arc<dyn OracleStore>> {
        self.store.as_ref()
    }

    /// Run one cycle for the catalog feeds of `asset`
    pub async fn run(&self, asset: Asset, sequence: u64) -> CycleSnapshot {
        self.run_feeds(asset, &feeds_for(asset), sequence).await
    }

    pub async fn run_feeds(&self, asset: Asset, feeds: &[FeedSpec], sequence: u64) -> CycleSnapshot {
        let outcomes = poll_feeds(self.reader.as_ref(), feeds).await;
        let fetched_at = unix_now();

        let mut readings = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    warn!(
                        oracle = %outcome.spec.name(),
                        address = ?source_address(&outcome.spec.source),
                        "{}", e
                    );
                    failures.push(FeedFailure {
                        name: outcome.spec.name(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() && readings.iter().all(|r| r.unsupported) {
            return CycleSnapshot {
                asset,
                sequence,
                completed_at: unix_now(),
                outcome: Err(CycleError::AllFeedsFailed {
                    asset,
                    failed: failures.len(),
                }),
            };
        }

        for reading in readings.iter().filter(|r| !r.unsupported) {
            if reading.is_stale(fetched_at, self.stale_after_secs) {
                debug!(
                    oracle = %reading.name,
                    age_secs = reading.age_secs(fetched_at),
                    "stale reading"
                );
            }
        }

        let new_updates = self.record_all(&readings, fetched_at).await;
        let stats = self.load_stats().await;

        if new_updates > 0 {
            info!("{} cycle {}: {} new updates", asset, sequence, new_updates);
        }

        CycleSnapshot {
            asset,
            sequence,
            completed_at: unix_now(),
            outcome: Ok(AggregateView {
                oracles: rank(readings, &stats),
                fetched_at,
                failures,
            }),
        }
    }

    /// Record readings in parallel; returns the number of new updates
    async fn record_all(&self, readings: &[OracleReading], now: i64) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        let results = join_all(readings.iter().map(|r| store.record(r, now))).await;

        let mut new_updates = 0;
        for (reading, result) in readings.iter().zip(results) {
            match result {
                Ok(outcome) if outcome.is_new() => new_updates += 1,
                Ok(_) => {}
                Err(e) => warn!(oracle = %reading.name, "recording failed: {}", e),
            }
        }
        new_updates
    }

    async fn load_stats(&self) -> StatsMap {
        let Some(store) = &self.store else {
            return StatsMap::new();
        };

        match store.latest_all().await {
            Ok(records) => stats_map(records),
            Err(e) => {
                warn!("loading oracle stats failed: {}", e);
                StatsMap::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use alloy::primitives::{I256, U256};
    use oracle_core::{
        FeedError, FeedSource, OracleProvider, RawFeedTuple, RecordOutcome, Scale, StoreError,
    };
    use oracle_store::SqliteStore;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Reader returning scripted tuples per oracle name
    #[derive(Default)]
    pub struct ScriptedReader {
        tuples: Mutex<HashMap<String, FeedResult<RawFeedTuple>>>,
    }

    impl ScriptedReader {
        pub fn set(&self, name: &str, result: FeedResult<RawFeedTuple>) {
            self.tuples.lock().insert(name.to_string(), result);
        }

        pub fn set_price(&self, name: &str, mantissa: i64, updated_at: u64) {
            let raw = RawFeedTuple::new(
                I256::try_from(mantissa).unwrap(),
                U256::from(updated_at),
                Scale::Decimals(8),
            );
            self.set(name, Ok(raw));
        }
    }

    #[async_trait]
    impl FeedReader for ScriptedReader {
        async fn read(&self, spec: &FeedSpec) -> FeedResult<RawFeedTuple> {
            let name = spec.name();
            self.tuples
                .lock()
                .get(&name)
                .cloned()
                .unwrap_or_else(|| Err(FeedError::unavailable(name, "not scripted")))
        }
    }

    /// Store whose every call fails
    struct BrokenStore;

    #[async_trait]
    impl OracleStore for BrokenStore {
        async fn record(&self, _: &OracleReading, _: i64) -> oracle_core::StoreResult<RecordOutcome> {
            Err(StoreError::failure("disk full"))
        }
        async fn latest(&self, _: &str) -> oracle_core::StoreResult<Option<oracle_core::LatestRecord>> {
            Err(StoreError::failure("disk full"))
        }
        async fn latest_all(&self) -> oracle_core::StoreResult<Vec<oracle_core::LatestRecord>> {
            Err(StoreError::failure("disk full"))
        }
        async fn history(&self, _: &str, _: u32) -> oracle_core::StoreResult<Vec<oracle_core::HistoryEntry>> {
            Err(StoreError::failure("disk full"))
        }
        async fn recent(&self, _: u32) -> oracle_core::StoreResult<Vec<oracle_core::HistoryEntry>> {
            Err(StoreError::failure("disk full"))
        }
        async fn prune(&self, _: &oracle_core::RetentionConfig, _: i64) -> oracle_core::StoreResult<u64> {
            Err(StoreError::failure("disk full"))
        }
    }

    fn feed(provider: OracleProvider, asset: Asset) -> FeedSpec {
        FeedSpec::new(
            provider,
            asset,
            FeedSource::Chronicle {
                address: Default::default(),
            },
        )
    }

    async fn memory_store() -> Arc<dyn OracleStore> {
        let store = SqliteStore::in_memory().await.unwrap();
        Arc::new(store)
    }

    fn expect_view(snapshot: CycleSnapshot) -> AggregateView {
        snapshot.outcome.expect("cycle succeeded")
    }

    #[tokio::test]
    async fn test_one_failing_feed_keeps_the_others() {
        let reader = Arc::new(ScriptedReader::default());
        reader.set_price("Chainlink", 250_000_000_000, 100);
        reader.set("Pyth", Err(FeedError::unavailable("Pyth", "execution reverted")));
        reader.set_price("Stork", 250_100_000_000, 110);

        let feeds = [
            feed(OracleProvider::Chainlink, Asset::Btc),
            feed(OracleProvider::Pyth, Asset::Btc),
            feed(OracleProvider::Stork, Asset::Btc),
        ];
        let runner = CycleRunner::new(reader, None);
        let view = expect_view(runner.run_feeds(Asset::Btc, &feeds, 1).await);

        let names: Vec<&str> = view.oracles.iter().map(|o| o.reading.name.as_str()).collect();
        assert_eq!(names, vec!["Stork", "Chainlink"]);
        assert_eq!(view.failures.len(), 1);
        assert_eq!(view.failures[0].name, "Pyth");
        assert_eq!(view.oracles[1].reading.price, 2500.0);
    }

    #[tokio::test]
    async fn test_all_feeds_failing_is_a_cycle_error() {
        let reader = Arc::new(ScriptedReader::default());
        let feeds = [
            feed(OracleProvider::Chainlink, Asset::Mon),
            FeedSpec::new(OracleProvider::EOracle, Asset::Mon, FeedSource::Unsupported),
        ];

        let snapshot = CycleRunner::new(reader, None).run_feeds(Asset::Mon, &feeds, 3).await;
        assert_eq!(snapshot.sequence, 3);
        assert_eq!(
            snapshot.outcome.unwrap_err(),
            CycleError::AllFeedsFailed {
                asset: Asset::Mon,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_feed_takes_last_slot_without_a_read() {
        let reader = Arc::new(ScriptedReader::default());
        reader.set_price("Chainlink (MON)", 3_000_000, 50);

        let feeds = [
            FeedSpec::new(OracleProvider::EOracle, Asset::Mon, FeedSource::Unsupported),
            feed(OracleProvider::Chainlink, Asset::Mon),
        ];
        let store = memory_store().await;
        let runner = CycleRunner::new(reader, Some(Arc::clone(&store)));
        let view = expect_view(runner.run_feeds(Asset::Mon, &feeds, 1).await);

        assert_eq!(view.oracles[0].reading.name, "Chainlink (MON)");
        assert!(view.oracles[1].reading.unsupported);
        assert_eq!(view.oracles[1].update_count, 0);
        assert!(store.latest("eOracle (MON)").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repolling_is_idempotent_and_counts_changes() {
        let reader = Arc::new(ScriptedReader::default());
        reader.set_price("Supra", 1, 1_000);
        let feeds = [feed(OracleProvider::Supra, Asset::Btc)];
        let store = memory_store().await;
        let runner = CycleRunner::new(Arc::clone(&reader) as Arc<dyn FeedReader>, Some(Arc::clone(&store)));

        for seq in 0..3 {
            let view = expect_view(runner.run_feeds(Asset::Btc, &feeds, seq).await);
            assert_eq!(view.oracles[0].update_count, 1);
        }

        reader.set_price("Supra", 2, 1_005);
        let view = expect_view(runner.run_feeds(Asset::Btc, &feeds, 3).await);
        assert_eq!(view.oracles[0].update_count, 2);
        assert!(view.oracles[0].last_change_at.is_some());
        assert_eq!(store.history("Supra", 100).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_default_stats() {
        let reader = Arc::new(ScriptedReader::default());
        reader.set_price("Orocle", 5, 10);
        let feeds = [feed(OracleProvider::Orocle, Asset::Btc)];

        let runner = CycleRunner::new(reader, Some(Arc::new(BrokenStore)));
        let view = expect_view(runner.run_feeds(Asset::Btc, &feeds, 1).await);

        assert_eq!(view.oracles.len(), 1);
        assert_eq!(view.oracles[0].update_count, 0);
        assert_eq!(view.oracles[0].last_change_at, None);
    }

    #[tokio::test]
    async fn test_catalog_cycle_uses_display_order_for_ties() {
        let reader = Arc::new(ScriptedReader::default());
        for spec in feeds_for(Asset::Btc) {
            reader.set_price(&spec.name(), 1, 500);
        }

        let view = expect_view(CycleRunner::new(reader, None).run(Asset::Btc, 1).await);
        let names: Vec<String> = view.oracles.into_iter().map(|o| o.reading.name).collect();
        let expected: Vec<String> = feeds_for(Asset::Btc).iter().map(|f| f.name()).collect();
        assert_eq!(names, expected);
    }
}
