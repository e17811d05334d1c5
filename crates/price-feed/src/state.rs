//! Latest published cycle per asset
//!
//! Uses DashMap so HTTP readers never wait on a running cycle

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use oracle_core::Asset;

use crate::poller::CycleSnapshot;

/// Most recent snapshot per asset
#[derive(Debug, Default)]
pub struct SnapshotState {
    snapshots: DashMap<Asset, CycleSnapshot>,

    /// Stats
    published: AtomicU64,
    failed: AtomicU64,
    superseded: AtomicU64,
}

impl SnapshotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a finished cycle.
    ///
    /// Cycles can finish out of order; a snapshot older than the stored one
    /// is dropped and `false` is returned.
    pub fn publish(&self, snapshot: CycleSnapshot) -> bool {
        let failed = snapshot.outcome.is_err();

        match self.snapshots.entry(snapshot.asset) {
            Entry::Occupied(mut entry) => {
                if entry.get().sequence >= snapshot.sequence {
                    self.superseded.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                entry.insert(snapshot);
            }
            Entry::Vacant(entry) => {
                entry.insert(snapshot);
            }
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    pub fn get(&self, asset: Asset) -> Option<CycleSnapshot> {
        self.snapshots.get(&asset).map(|r| r.value().clone())
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            asset_count: self.snapshots.len(),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about published cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStats {
    pub asset_count: usize,
    pub published: u64,
    pub failed: u64,
    pub superseded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::{AggregateView, CycleError};
    use std::sync::Arc;
    use std::thread;

    fn snapshot(asset: Asset, sequence: u64) -> CycleSnapshot {
        CycleSnapshot {
            asset,
            sequence,
            completed_at: sequence as i64,
            outcome: Ok(AggregateView {
                oracles: vec![],
                fetched_at: sequence as i64,
                failures: vec![],
            }),
        }
    }

    #[test]
    fn test_older_cycle_does_not_replace_newer() {
        let state = SnapshotState::new();
        assert!(state.publish(snapshot(Asset::Btc, 2)));
        assert!(!state.publish(snapshot(Asset::Btc, 1)));
        assert!(!state.publish(snapshot(Asset::Btc, 2)));

        assert_eq!(state.get(Asset::Btc).unwrap().sequence, 2);
        assert_eq!(state.stats().superseded, 2);
        assert!(state.get(Asset::Mon).is_none());
    }

    #[test]
    fn test_failed_cycles_are_counted() {
        let state = SnapshotState::new();
        let mut failed = snapshot(Asset::Mon, 1);
        failed.outcome = Err(CycleError::AllFeedsFailed {
            asset: Asset::Mon,
            failed: 7,
        });
        state.publish(failed);
        state.publish(snapshot(Asset::Btc, 1));

        let stats = state.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.asset_count, 2);
    }

    #[test]
    fn test_concurrent_publish_keeps_highest_sequence() {
        let state = Arc::new(SnapshotState::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for j in 0..100 {
                        state.publish(snapshot(Asset::Btc, j * 4 + i));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(state.get(Asset::Btc).unwrap().sequence, 399);
    }
}
