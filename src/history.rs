//! Price and trade history
//!
//! SQLite-backed log of price ticks and completed user transactions. Ticks
//! carry their smoothed (weighted moving average) quotes, computed when the
//! tick is recorded.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::averages::{latest_moving_average, NUM_WEIGHING_SAMPLES};
use crate::error::Result;
use crate::exchange::Exchange;
use crate::money::round2;
use crate::types::{PriceTick, Side, Ticker, UserTransaction};

pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self { conn };
        store.create_tables()?;
        debug!("History store opened at {}", db_path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS prices (
                time INTEGER PRIMARY KEY,
                buy REAL NOT NULL,
                sell REAL NOT NULL,
                wa_buy REAL,
                wa_sell REAL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                time INTEGER PRIMARY KEY,
                usd REAL NOT NULL,
                btc REAL NOT NULL,
                rate REAL NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    // =========================================================================
    // Price ticks
    // =========================================================================

    /// Append a tick for `ticker`, smoothing it against the recent history
    pub fn record_tick(&self, time: i64, ticker: Ticker) -> Result<PriceTick> {
        let mut recent = self.recent_ticks(NUM_WEIGHING_SAMPLES - 1)?;
        recent.retain(|t| t.time < time);

        let mut buys: Vec<f64> = recent.iter().map(|t| t.buy).collect();
        let mut sells: Vec<f64> = recent.iter().map(|t| t.sell).collect();
        buys.push(ticker.buy);
        sells.push(ticker.sell);

        let tick = PriceTick {
            time,
            buy: ticker.buy,
            sell: ticker.sell,
            wa_buy: round2(latest_moving_average(&buys, NUM_WEIGHING_SAMPLES).unwrap_or(ticker.buy)),
            wa_sell: round2(
                latest_moving_average(&sells, NUM_WEIGHING_SAMPLES).unwrap_or(ticker.sell),
            ),
        };

        self.insert_tick(&tick)?;
        info!(
            "Recorded tick {}: buy ${} sell ${} (avg ${} / ${})",
            tick.time, tick.buy, tick.sell, tick.wa_buy, tick.wa_sell
        );
        Ok(tick)
    }

    pub fn insert_tick(&self, tick: &PriceTick) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO prices (time, buy, sell, wa_buy, wa_sell)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tick.time, tick.buy, tick.sell, tick.wa_buy, tick.wa_sell],
        )?;
        Ok(())
    }

    fn tick_from_row(row: &Row<'_>) -> rusqlite::Result<PriceTick> {
        let buy: f64 = row.get(1)?;
        let sell: f64 = row.get(2)?;
        Ok(PriceTick {
            time: row.get(0)?,
            buy,
            sell,
            wa_buy: row.get::<_, Option<f64>>(3)?.unwrap_or(buy),
            wa_sell: row.get::<_, Option<f64>>(4)?.unwrap_or(sell),
        })
    }

    pub fn latest_tick(&self) -> Result<Option<PriceTick>> {
        let tick = self
            .conn
            .query_row(
                "SELECT time, buy, sell, wa_buy, wa_sell FROM prices ORDER BY time DESC LIMIT 1",
                [],
                Self::tick_from_row,
            )
            .optional()?;
        Ok(tick)
    }

    /// The most recent `n` ticks, oldest first
    pub fn recent_ticks(&self, n: usize) -> Result<Vec<PriceTick>> {
        let mut stmt = self.conn.prepare(
            "SELECT time, buy, sell, wa_buy, wa_sell FROM prices ORDER BY time DESC LIMIT ?1",
        )?;
        let mut ticks = stmt
            .query_map(params![n as i64], Self::tick_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ticks.reverse();
        Ok(ticks)
    }

    /// Ticks with `from <= time <= to`, oldest first
    pub fn ticks_between(&self, from: i64, to: i64) -> Result<Vec<PriceTick>> {
        let mut stmt = self.conn.prepare(
            "SELECT time, buy, sell, wa_buy, wa_sell FROM prices
             WHERE time >= ?1 AND time <= ?2 ORDER BY time",
        )?;
        let ticks = stmt
            .query_map(params![from, to], Self::tick_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ticks)
    }

    /// Buy quotes recorded strictly after `time`
    pub fn buy_prices_since(&self, time: i64) -> Result<Vec<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT buy FROM prices WHERE time > ?1 ORDER BY time")?;
        let prices = stmt
            .query_map(params![time], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<f64>>>()?;
        Ok(prices)
    }

    /// Raw and smoothed sell quotes recorded strictly after `time`
    pub fn sell_prices_since(&self, time: i64) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut stmt = self.conn.prepare(
            "SELECT sell, COALESCE(wa_sell, sell) FROM prices WHERE time > ?1 ORDER BY time",
        )?;
        let rows = stmt
            .query_map(params![time], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(f64, f64)>>>()?;
        Ok(rows.into_iter().unzip())
    }

    /// Write ticks in `[from, to]` as CSV, returning the number of rows
    pub fn export_csv<W: Write>(&self, from: i64, to: i64, writer: W) -> Result<usize> {
        let ticks = self.ticks_between(from, to)?;
        let mut wtr = csv::Writer::from_writer(writer);
        for tick in &ticks {
            wtr.serialize(tick)?;
        }
        wtr.flush()?;
        Ok(ticks.len())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Insert or replace transactions keyed by time
    pub fn upsert_transactions(&self, transactions: &[UserTransaction]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO transactions (time, usd, btc, rate) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for tx in transactions {
            stmt.execute(params![tx.time, tx.usd, tx.btc, tx.rate])?;
        }
        Ok(transactions.len())
    }

    /// Most recent completed trade in the given direction
    pub fn last_trade(&self, side: Side) -> Result<Option<UserTransaction>> {
        let sql = match side {
            Side::Buy => {
                "SELECT time, usd, btc, rate FROM transactions WHERE usd < 0 ORDER BY time DESC LIMIT 1"
            }
            Side::Sell => {
                "SELECT time, usd, btc, rate FROM transactions WHERE usd > 0 ORDER BY time DESC LIMIT 1"
            }
        };
        let tx = self
            .conn
            .query_row(sql, [], |row| {
                Ok(UserTransaction {
                    time: row.get(0)?,
                    usd: row.get(1)?,
                    btc: row.get(2)?,
                    rate: row.get(3)?,
                })
            })
            .optional()?;
        Ok(tx)
    }

    /// Pull the exchange's transaction history into the store
    pub fn sync_transactions(&self, exchange: &dyn Exchange) -> Result<usize> {
        let transactions = exchange.transactions()?;
        let count = self.upsert_transactions(&transactions)?;
        info!("Synced {} transactions from the exchange", count);
        Ok(count)
    }
}
