//! Freshness ranking of a poll cycle's readings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{LatestRecord, OracleReading};

/// A reading enriched with its persisted statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedOracle {
    #[serde(flatten)]
    pub reading: OracleReading,
    pub update_count: u64,
    pub last_change_at: Option<i64>,
}

/// A feed that produced nothing this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFailure {
    pub name: String,
    pub error: String,
}

/// Aggregate view served to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    pub oracles: Vec<RankedOracle>,
    pub fetched_at: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FeedFailure>,
}

/// Per-oracle statistics keyed by oracle name
pub type StatsMap = HashMap<String, LatestRecord>;

pub fn stats_map(records: Vec<LatestRecord>) -> StatsMap {
    records
        .into_iter()
        .map(|r| (r.oracle_name.clone(), r))
        .collect()
}

/// Rank readings: supported before unsupported, then freshest first.
///
/// `readings` must be in fetch order; the sort is stable so equal keys
/// keep that order. Oracles without a record get zeroed stats.
pub fn rank(readings: Vec<OracleReading>, stats: &StatsMap) -> Vec<RankedOracle> {
    let mut ranked: Vec<RankedOracle> = readings
        .into_iter()
        .map(|reading| {
            let record = stats.get(&reading.name);
            RankedOracle {
                update_count: record.map(|r| r.update_count).unwrap_or(0),
                last_change_at: record.and_then(|r| r.last_change_at),
                reading,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.reading
            .unsupported
            .cmp(&b.reading.unsupported)
            .then_with(|| b.reading.updated_at.cmp(&a.reading.updated_at))
    });

    ranked
}
