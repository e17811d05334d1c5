//! Configuration loading
//!
//! Sources, lowest priority first: built-in defaults, an optional
//! `oracle-aggregator.toml`, then `ORACLE__*` environment variables
//! (`ORACLE__POLL__INTERVAL_MS=500`). `DATABASE_URL` fills
//! `storage.database_url` when nothing else set it.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use std::env;
use thiserror::Error;

use oracle_core::{AppConfig, CoreError};

/// Base name of the optional config file
pub const CONFIG_FILE: &str = "oracle-aggregator";

pub const ENV_PREFIX: &str = "ORACLE";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Config error: {0}")]
    Source(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// Load configuration from the file and the process environment
pub fn load() -> Result<AppConfig, SettingsError> {
    let builder = Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("poll.assets"),
        );

    build(builder, env::var("DATABASE_URL").ok())
}

/// Resolve `builder` into a validated [`AppConfig`]
pub fn build(
    builder: ConfigBuilder<DefaultState>,
    database_url: Option<String>,
) -> Result<AppConfig, SettingsError> {
    let mut config: AppConfig = builder.build()?.try_deserialize()?;

    if config.storage.database_url.as_deref().map_or(true, str::is_empty) {
        config.storage.database_url = database_url.filter(|url| !url.is_empty());
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use oracle_core::Asset;

    fn from_toml(toml: &str) -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(toml, FileFormat::Toml))
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = build(Config::builder(), None).unwrap();
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.poll.assets, Asset::ALL.to_vec());
        assert!(config.storage.database_url.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [rpc]
            http_url = "http://localhost:8545"
            timeout_ms = 2500

            [poll]
            interval_ms = 250
            assets = ["mon"]

            [retention]
            max_entries_per_oracle = 50
        "#;

        let config = build(from_toml(toml), None).unwrap();
        assert_eq!(config.rpc.http_url, "http://localhost:8545");
        assert_eq!(config.rpc.timeout_ms, 2500);
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.assets, vec![Asset::Mon]);
        assert_eq!(config.retention.max_entries_per_oracle, Some(50));
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_database_url_fallback() {
        let config = build(Config::builder(), Some("sqlite://oracles.db".to_string())).unwrap();
        assert_eq!(config.storage.database_url.as_deref(), Some("sqlite://oracles.db"));

        let config = build(Config::builder(), Some(String::new())).unwrap();
        assert!(config.storage.database_url.is_none());
    }

    #[test]
    fn test_configured_database_url_wins() {
        let toml = r#"
            [storage]
            database_url = "sqlite://configured.db"
        "#;

        let config =
            build(from_toml(toml), Some("sqlite://env.db".to_string())).unwrap();
        assert_eq!(
            config.storage.database_url.as_deref(),
            Some("sqlite://configured.db")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let toml = r#"
            [poll]
            interval_ms = 0
        "#;
        assert!(matches!(
            build(from_toml(toml), None),
            Err(SettingsError::Invalid(_))
        ));

        let toml = r#"
            [poll]
            assets = ["eth"]
        "#;
        assert!(matches!(
            build(from_toml(toml), None),
            Err(SettingsError::Source(_))
        ));
    }
}
