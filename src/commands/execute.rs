//! Manual purge / acquire

use anyhow::Result;
use tracing::info;

use ooda_trader::rules::{FALLING_TRENCH_BAND, RISING_PEAK_BAND};
use ooda_trader::{ExecutionOutcome, OrderExecutor};

/// Sell all BTC now
pub fn purge(config_path: &str) -> Result<()> {
    run(config_path, true)
}

/// Spend all USD now
pub fn acquire(config_path: &str) -> Result<()> {
    run(config_path, false)
}

fn run(config_path: &str, selling: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let exchange = super::open_exchange(&config)?;
    let history = super::open_history(&config)?;
    let mut bands = super::open_band_store(&config)?;
    let executor = OrderExecutor::new(config.execution.clone());

    let (outcome, band) = if selling {
        (executor.purge(&exchange)?, RISING_PEAK_BAND)
    } else {
        (executor.acquire(&exchange)?, FALLING_TRENCH_BAND)
    };

    match outcome {
        ExecutionOutcome::Completed {
            iterations,
            orders_placed,
        } => {
            bands.delete_band(band)?;
            history.sync_transactions(&exchange)?;
            info!("Cleared {}", band);
            println!(
                "Completed after {} iterations ({} orders)",
                iterations, orders_placed
            );
        }
        ExecutionOutcome::Aborted {
            reference_price,
            current_price,
            iterations,
        } => {
            println!(
                "Aborted after {} iterations: price moved from ${:.2} to ${:.2}",
                iterations, reference_price, current_price
            );
        }
    }
    Ok(())
}
