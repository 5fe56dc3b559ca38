//! Record command: append the current quotes to the price history

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use ooda_trader::Exchange;

pub fn run(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let exchange = super::open_exchange(&config)?;
    let history = super::open_history(&config)?;

    let ticker = exchange.current_price().context("Failed to fetch ticker")?;
    let tick = history.record_tick(Utc::now().timestamp(), ticker)?;

    info!(
        "Recorded tick: buy ${} (avg ${}) sell ${} (avg ${})",
        tick.buy, tick.wa_buy, tick.sell, tick.wa_sell
    );
    Ok(())
}
