//! Sync command: pull user transactions into the history store

use anyhow::{Context, Result};

pub fn run(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let exchange = super::open_exchange(&config)?;
    let history = super::open_history(&config)?;

    let count = history
        .sync_transactions(&exchange)
        .context("Failed to sync transactions")?;
    println!("Synced {} transactions", count);
    Ok(())
}
