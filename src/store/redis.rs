//! Redis-backed rule state
//!
//! Plain GET/SET/DEL on top-level keys, so values can be inspected and edited
//! with `redis-cli` while the bot is idle.

use ::redis::{Client, Commands, Connection};
use tracing::{debug, info};

use super::BandStore;
use crate::error::Result;

pub struct RedisBandStore {
    conn: Connection,
}

impl RedisBandStore {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379/0")
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection()?;
        info!("Connected to Redis at {}", redis_url);
        Ok(Self { conn })
    }
}

impl BandStore for RedisBandStore {
    fn get(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.conn.get(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.set::<_, _, ()>(key, value)?;
        debug!("redis {} = {}", key, value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.conn.del::<_, ()>(key)?;
        debug!("redis {} deleted", key);
        Ok(())
    }

    fn entries(&mut self) -> Result<Vec<(String, String)>> {
        let mut keys: Vec<String> = self.conn.keys("*")?;
        keys.sort();

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(&key)? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }
}
