//! Configuration management
//!
//! Handles loading and parsing of the JSON configuration file with environment
//! variable support for API credentials. Every section has defaults, so a
//! missing section (or a missing file via [`Config::load_or_default`]) is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::rules::RuleParams;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub storage: StorageConfig,
    pub execution: ExecutionConfig,
    /// Defaults for the rule tunables; values stored in the band store win
    pub rules: RuleParams,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.exchange.apply_env();
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let mut config = Config::default();
            config.exchange.apply_env();
            Ok(config)
        }
    }
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            base_url: "https://www.bitstamp.net".to_string(),
            client_id: None,
            api_key: None,
            api_secret: None,
            timeout_secs: 30,
        }
    }
}

impl ExchangeConfig {
    /// Override credentials from `BITSTAMP_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(client_id) = std::env::var("BITSTAMP_CLIENT_ID") {
            self.client_id = Some(client_id);
        }
        if let Ok(api_key) = std::env::var("BITSTAMP_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("BITSTAMP_API_SECRET") {
            self.api_secret = Some(api_secret);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where rule state (bands, tunables, enable flags) is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandBackend {
    Sqlite,
    Redis,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding price ticks, transactions and (by default) rule state
    pub db_path: PathBuf,
    pub band_backend: BandBackend,
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            db_path: PathBuf::from("data.db"),
            band_backend: BandBackend::Sqlite,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

/// Tolerances and pacing of the purge/acquire loops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// A sell price below `factor * last order price` replaces the sell order
    pub sell_price_drop_factor: f64,
    /// A sell price above `factor * last order price` cancels the purge
    pub sell_price_rise_factor: f64,
    /// A buy price below `factor * last order price` cancels the acquire
    pub buy_price_drop_factor: f64,
    /// A buy price above `factor * last order price` replaces the buy order
    pub buy_price_rise_factor: f64,
    /// Seconds to wait between order updates
    pub transaction_interval_secs: u64,
    /// USD below which an acquire considers the balance spent
    pub min_usd_order: f64,
    /// BTC below which a purge considers the balance sold
    pub min_btc_order: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            sell_price_drop_factor: 0.9975,
            sell_price_rise_factor: 1.005,
            buy_price_drop_factor: 0.995,
            buy_price_rise_factor: 1.0025,
            transaction_interval_secs: 10,
            min_usd_order: 1.0,
            min_btc_order: 1e-8,
        }
    }
}

impl ExecutionConfig {
    pub fn transaction_interval(&self) -> Duration {
        Duration::from_secs(self.transaction_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "storage": { "band_backend": "redis" },
            "execution": { "transaction_interval_secs": 3 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.storage.band_backend, BandBackend::Redis);
        assert_eq!(config.storage.db_path, PathBuf::from("data.db"));
        assert_eq!(config.execution.transaction_interval(), Duration::from_secs(3));
        assert_eq!(config.execution.sell_price_drop_factor, 0.9975);
        assert_eq!(config.rules.minimize_loss_drop_factor, 0.97);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.exchange.base_url, "https://www.bitstamp.net");
        assert_eq!(config.execution.min_usd_order, 1.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("definitely/not/here.json").unwrap();
        assert_eq!(config.storage.band_backend, BandBackend::Sqlite);
    }
}
