//! CLI command implementations

pub mod cycle;
pub mod execute;
pub mod extract;
pub mod params;
pub mod record;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use tracing::info;

use ooda_trader::config::BandBackend;
use ooda_trader::exchange::BitstampClient;
use ooda_trader::history::HistoryStore;
use ooda_trader::store::{BandStore, RedisBandStore, SqliteBandStore};
use ooda_trader::Config;

pub fn load_config(config_path: &str) -> Result<Config> {
    let config = Config::load_or_default(config_path)?;
    info!("Loaded configuration from: {}", config_path);
    Ok(config)
}

pub fn open_exchange(config: &Config) -> Result<BitstampClient> {
    BitstampClient::from_config(&config.exchange).context("Failed to create Bitstamp client")
}

pub fn open_history(config: &Config) -> Result<HistoryStore> {
    HistoryStore::open(&config.storage.db_path).with_context(|| {
        format!(
            "Failed to open history database: {}",
            config.storage.db_path.display()
        )
    })
}

pub fn open_band_store(config: &Config) -> Result<Box<dyn BandStore>> {
    let store: Box<dyn BandStore> = match config.storage.band_backend {
        BandBackend::Sqlite => Box::new(
            SqliteBandStore::open(&config.storage.db_path)
                .context("Failed to open SQLite rule state")?,
        ),
        BandBackend::Redis => Box::new(
            RedisBandStore::connect(&config.storage.redis_url)
                .context("Failed to connect to Redis rule state")?,
        ),
    };
    Ok(store)
}
