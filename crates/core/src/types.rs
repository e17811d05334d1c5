//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Staleness threshold used by the reference deployment
pub const DEFAULT_STALE_AFTER_SECS: i64 = 60;

/// Assets quoted against USD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Btc,
    Mon,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Btc, Asset::Mon];

    pub fn pair(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC/USD",
            Asset::Mon => "MON/USD",
        }
    }

    /// Suffix appended to provider names so that feeds for different
    /// assets never share an oracle name. BTC keeps the bare name.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            Asset::Btc => "",
            Asset::Mon => " (MON)",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pair())
    }
}

impl FromStr for Asset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "btc" | "btc/usd" => Ok(Asset::Btc),
            "mon" | "mon/usd" => Ok(Asset::Mon),
            other => Err(CoreError::UnknownAsset(other.to_string())),
        }
    }
}

/// Oracle networks polled on Monad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleProvider {
    Chainlink,
    Pyth,
    Chronicle,
    EOracle,
    Orocle,
    RedStone,
    Stork,
    Supra,
}

impl OracleProvider {
    pub fn name(&self) -> &'static str {
        match self {
            OracleProvider::Chainlink => "Chainlink",
            OracleProvider::Pyth => "Pyth",
            OracleProvider::Chronicle => "Chronicle",
            OracleProvider::EOracle => "eOracle",
            OracleProvider::Orocle => "Orocle",
            OracleProvider::RedStone => "RedStone",
            OracleProvider::Stork => "Stork",
            OracleProvider::Supra => "Supra",
        }
    }

    /// Oracle name for this provider's feed of `asset`
    pub fn oracle_name(&self, asset: Asset) -> String {
        format!("{}{}", self.name(), asset.name_suffix())
    }
}

impl fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One normalized observation of one oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleReading {
    pub name: String,
    pub price: f64,
    /// Oracle-reported unix seconds
    pub updated_at: i64,
    pub decimals: u8,
    /// Exact integer mantissa
    pub raw_price: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unsupported: bool,
}

impl OracleReading {
    /// Placeholder for a provider that has no feed for an asset
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: 0.0,
            updated_at: 0,
            decimals: 0,
            raw_price: "0".to_string(),
            unsupported: true,
        }
    }

    pub fn age_secs(&self, now: i64) -> i64 {
        now.saturating_sub(self.updated_at)
    }

    pub fn is_stale(&self, now: i64, threshold_secs: i64) -> bool {
        self.age_secs(now) > threshold_secs
    }
}

/// Durable per-oracle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestRecord {
    pub oracle_name: String,
    pub price: f64,
    pub updated_at: i64,
    pub recorded_at: i64,
    pub decimals: u8,
    pub raw_price: String,
    /// Wall-clock seconds of the last accepted change
    pub last_change_at: Option<i64>,
    /// Distinct `updated_at` values observed
    pub update_count: u64,
}

/// Append-only record of one accepted change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub oracle_name: String,
    pub price: f64,
    pub updated_at: i64,
    pub recorded_at: i64,
    pub decimals: u8,
    pub raw_price: String,
}

/// Result of handing a reading to the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new `updated_at` was recorded
    New { update_count: u64 },
    /// Repeated observation, nothing written
    Unchanged,
}

impl RecordOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, RecordOutcome::New { .. })
    }
}

/// Wall-clock unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_names() {
        assert_eq!(OracleProvider::Chainlink.oracle_name(Asset::Btc), "Chainlink");
        assert_eq!(OracleProvider::EOracle.oracle_name(Asset::Mon), "eOracle (MON)");
    }

    #[test]
    fn test_asset_parse() {
        assert_eq!("mon".parse::<Asset>().unwrap(), Asset::Mon);
        assert_eq!("BTC/USD".parse::<Asset>().unwrap(), Asset::Btc);
        assert!("eth".parse::<Asset>().is_err());
    }

    #[test]
    fn test_reading_json_shape() {
        let reading = OracleReading {
            name: "Pyth".to_string(),
            price: 3.14917,
            updated_at: 1000,
            decimals: 5,
            raw_price: "314917".to_string(),
            unsupported: false,
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["updatedAt"], 1000);
        assert_eq!(json["rawPrice"], "314917");
        assert!(json.get("unsupported").is_none());

        let sentinel = serde_json::to_value(OracleReading::unsupported("eOracle (MON)")).unwrap();
        assert_eq!(sentinel["unsupported"], true);
        assert_eq!(sentinel["rawPrice"], "0");
    }

    #[test]
    fn test_staleness() {
        let mut reading = OracleReading::unsupported("x");
        reading.unsupported = false;
        reading.updated_at = 1_000;

        assert!(!reading.is_stale(1_060, DEFAULT_STALE_AFTER_SECS));
        assert!(reading.is_stale(1_061, DEFAULT_STALE_AFTER_SECS));
    }
}
