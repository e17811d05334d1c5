//! JSON bodies returned by the HTTP routes

use serde::{Deserialize, Serialize};

use oracle_core::{Asset, HistoryEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// History of one oracle, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleHistoryResponse {
    pub oracle: String,
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Most recent updates across all oracles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUpdatesResponse {
    pub updates: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every asset has a successful cycle
    Ok,
    /// At least one asset has not completed a cycle yet
    Starting,
    /// The latest cycle of at least one asset failed
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStatus {
    Sqlite,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHealth {
    pub asset: Asset,
    pub pair: String,
    pub last_cycle: Option<u64>,
    pub completed_at: Option<i64>,
    pub oracle_count: usize,
    pub failure_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub storage: StorageStatus,
    pub uptime_secs: u64,
    pub assets: Vec<AssetHealth>,
}
