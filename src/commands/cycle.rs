//! Cycle command: observe, evaluate the rule chain, act

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use ooda_trader::exchange::PaperExchange;
use ooda_trader::execution::{NoSleep, OrderExecutor};
use ooda_trader::history::HistoryStore;
use ooda_trader::rules::{initiate_decisions, FALLING_TRENCH_BAND, RISING_PEAK_BAND};
use ooda_trader::store::MemoryBandStore;
use ooda_trader::{BandStore, Context, CycleReport, Data, DecisionEngine, Exchange};

pub fn run(config_path: &str, dry_run: bool) -> Result<()> {
    info!("Starting cycle{}", if dry_run { " (dry run)" } else { "" });

    let config = super::load_config(config_path)?;
    let exchange = super::open_exchange(&config)?;
    let history = super::open_history(&config)?;
    let mut bands = super::open_band_store(&config)?;

    history
        .sync_transactions(&exchange)
        .context("Failed to sync transactions")?;
    let data = Data::observe(&history, &exchange).context("Failed to build market snapshot")?;
    info!("{}", data);

    let params = config.rules.resolve(bands.as_mut())?;
    let mut engine = DecisionEngine::new(initiate_decisions());

    let report = if dry_run {
        let paper = PaperExchange::new(exchange.current_price()?, exchange.balance()?);
        let mut paper_bands = MemoryBandStore::snapshot_of(bands.as_mut())?;
        let paper_history = HistoryStore::open_in_memory()?;
        let executor = OrderExecutor::with_sleeper(config.execution.clone(), Box::new(NoSleep));

        let mut ctx = Context {
            exchange: &paper,
            bands: &mut paper_bands,
            history: &paper_history,
            executor: &executor,
            params: &params,
        };
        let report = engine.run(&data, &mut ctx)?;

        for order in paper.placed_orders() {
            println!(
                "  would place {} {:.8} BTC @ ${:.2}",
                order.side, order.amount, order.price
            );
        }
        print_bands(&mut paper_bands);
        report
    } else {
        let executor = OrderExecutor::new(config.execution.clone());
        let mut ctx = Context {
            exchange: &exchange,
            bands: bands.as_mut(),
            history: &history,
            executor: &executor,
            params: &params,
        };
        engine.run(&data, &mut ctx)?
    };

    print_report(&report);
    info!("Cycle completed");
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("\n{}", "=".repeat(60));
    println!("CYCLE REPORT");
    println!("{}", "=".repeat(60));
    if report.matched.is_empty() {
        println!("No decision triggered");
    } else {
        println!("Triggered:          {}", report.matched.join(", "));
    }
    match &report.halted_by {
        Some(name) => println!("Halted by:          {}", name),
        None => println!("Halted by:          -"),
    }
    println!("{}", "=".repeat(60));
}

fn print_bands(bands: &mut dyn BandStore) {
    for key in [RISING_PEAK_BAND, FALLING_TRENCH_BAND] {
        match bands.band(key) {
            Ok(Some(band)) => println!("  {}: {}", key, band),
            Ok(None) => println!("  {}: inactive", key),
            Err(e) => warn!("Unreadable {}: {}", key, e),
        }
    }
}
