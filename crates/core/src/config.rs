//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Asset, CoreError, CoreResult, DEFAULT_STALE_AFTER_SECS};

/// JSON-RPC endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub http_url: String,
    pub chain_id: u64,
    /// Upper bound for a single feed read
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_url: "https://rpc.monad.xyz".to_string(),
            chain_id: 10143,
            timeout_ms: 5_000,
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Poll driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub stale_after_secs: i64,
    pub assets: Vec<Asset>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            assets: Asset::ALL.to_vec(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Durable store configuration. No URL means stats-free serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
        }
    }
}

/// History retention. Both bounds unset keeps history forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_entries_per_oracle: Option<u32>,
    pub max_age_secs: Option<u64>,
    pub interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_entries_per_oracle: Some(10_000),
            max_age_secs: None,
            interval_secs: 300,
        }
    }
}

impl RetentionConfig {
    pub fn keep_forever() -> Self {
        Self {
            max_entries_per_oracle: None,
            max_age_secs: None,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_entries_per_oracle.is_some() || self.max_age_secs.is_some()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub poll: PollConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.rpc.http_url.is_empty() {
            return Err(CoreError::InvalidConfig("rpc.http_url is empty".to_string()));
        }
        if self.poll.interval_ms == 0 {
            return Err(CoreError::InvalidConfig("poll.interval_ms must be positive".to_string()));
        }
        if self.poll.assets.is_empty() {
            return Err(CoreError::InvalidConfig("poll.assets is empty".to_string()));
        }
        if self.retention.is_enabled() && self.retention.interval_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "retention.interval_secs must be positive".to_string(),
            ));
        }
        if self.storage.max_connections == 0 {
            return Err(CoreError::InvalidConfig(
                "storage.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.interval(), Duration::from_secs(1));
        assert!(config.storage.database_url.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"poll": {"assets": ["mon"]}}"#).unwrap();
        assert_eq!(config.poll.assets, vec![Asset::Mon]);
        assert_eq!(config.poll.interval_ms, 1_000);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let mut config = AppConfig::default();
        config.poll.interval_ms = 0;
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_keep_forever_disables_retention() {
        assert!(!RetentionConfig::keep_forever().is_enabled());
        assert!(RetentionConfig::default().is_enabled());
    }
}
