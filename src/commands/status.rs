//! Status command: market, account and rule state at a glance

use anyhow::Result;
use tracing::warn;

use ooda_trader::rules::{FALLING_TRENCH_BAND, RISING_PEAK_BAND};
use ooda_trader::{format_time, Exchange, Side};

pub fn run(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let exchange = super::open_exchange(&config)?;
    let history = super::open_history(&config)?;
    let mut bands = super::open_band_store(&config)?;

    let ticker = exchange.current_price()?;
    let balance = exchange.balance()?;
    let orders = exchange.open_orders()?;

    println!("\n{}", "=".repeat(60));
    println!("STATUS");
    println!("{}", "=".repeat(60));
    println!("Buy (ask):          ${:.2}", ticker.buy);
    println!("Sell (bid):         ${:.2}", ticker.sell);
    if let Some(tick) = history.latest_tick()? {
        println!(
            "Last tick:          {} buy ${:.2} / sell ${:.2}",
            format_time(tick.time),
            tick.buy,
            tick.sell
        );
        println!(
            "Smoothed:           buy ${:.2} / sell ${:.2}",
            tick.wa_buy, tick.wa_sell
        );
    }
    println!("USD balance:        ${:.2}", balance.usd);
    println!("BTC balance:        {:.8}", balance.btc);
    println!("Fee:                {}%", balance.fee);
    println!("Open orders:        {}", orders.len());

    for side in [Side::Buy, Side::Sell] {
        if let Some(tx) = history.last_trade(side)? {
            println!(
                "Last {}:           ${:.2} at {}",
                side,
                tx.rate,
                format_time(tx.time)
            );
        }
    }

    for key in [RISING_PEAK_BAND, FALLING_TRENCH_BAND] {
        match bands.band(key) {
            Ok(Some(band)) => println!("{:<20}{}", key, band),
            Ok(None) => println!("{:<20}inactive", key),
            Err(e) => warn!("Unreadable {}: {}", key, e),
        }
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
