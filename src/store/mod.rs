//! Rule state store
//!
//! Key/value persistence for the ratcheting bands, the tunable rule
//! parameters and the per-rule enable flags. Backends only implement raw
//! string access; typed accessors are provided on top.
//!
//! There is no locking: a single cycle is assumed to run at a time.

pub mod redis;
pub mod sqlite;

pub use self::redis::RedisBandStore;
pub use self::sqlite::SqliteBandStore;

use std::collections::BTreeMap;

use crate::error::{Result, TradeError};
use crate::types::Band;

pub trait BandStore {
    fn get(&mut self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn delete(&mut self, key: &str) -> Result<()>;

    /// All stored pairs, sorted by key
    fn entries(&mut self) -> Result<Vec<(String, String)>>;

    fn band(&mut self, name: &str) -> Result<Option<Band>> {
        match self.get(name)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|_| TradeError::InvalidValue {
                    key: name.to_string(),
                    value: raw,
                }),
            None => Ok(None),
        }
    }

    fn set_band(&mut self, name: &str, band: &Band) -> Result<()> {
        self.set(name, &serde_json::to_string(band)?)
    }

    fn delete_band(&mut self, name: &str) -> Result<()> {
        self.delete(name)
    }

    fn param(&mut self, key: &str) -> Result<Option<f64>> {
        match self.get(key)? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| TradeError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
            None => Ok(None),
        }
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<()> {
        self.set(key, &value.to_string())
    }

    /// Enable flags accept `true`/`false` in any case.
    ///
    /// `None` for a missing key; [`RuleParams::resolve`](crate::rules::RuleParams::resolve)
    /// then keeps the configured default, which is enabled. Stores carried over
    /// from deployments that read a missing flag as disabled need every
    /// `active_*` key written explicitly, e.g. with `params load`.
    fn flag(&mut self, key: &str) -> Result<Option<bool>> {
        match self.get(key)? {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(TradeError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
            },
            None => Ok(None),
        }
    }

    fn set_flag(&mut self, key: &str, value: bool) -> Result<()> {
        self.set(key, if value { "true" } else { "false" })
    }
}

/// Process-local store, used for dry runs and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryBandStore {
    values: BTreeMap<String, String>,
}

impl MemoryBandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every entry of another store
    pub fn snapshot_of(other: &mut dyn BandStore) -> Result<Self> {
        Ok(MemoryBandStore {
            values: other.entries()?.into_iter().collect(),
        })
    }
}

impl BandStore for MemoryBandStore {
    fn get(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn entries(&mut self) -> Result<Vec<(String, String)>> {
        Ok(self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
