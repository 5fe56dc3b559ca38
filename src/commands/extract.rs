//! Extract command: dump price ticks in a time range to CSV

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use tracing::info;

pub fn run(config_path: &str, from: &str, to: &str, output: &str) -> Result<()> {
    let from_ts = parse_time(from, false)?;
    let to_ts = parse_time(to, true)?;

    let config = super::load_config(config_path)?;
    let history = super::open_history(&config)?;

    let file =
        File::create(output).with_context(|| format!("Failed to create output file: {}", output))?;
    let rows = history.export_csv(from_ts, to_ts, file)?;

    info!("Wrote {} ticks to {}", rows, output);
    println!("Wrote {} ticks to {}", rows, output);
    Ok(())
}

/// Unix seconds, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (UTC). A bare date
/// covers the whole day when it ends the range.
fn parse_time(value: &str, end_of_range: bool) -> Result<i64> {
    if let Ok(ts) = value.parse::<i64>() {
        return Ok(ts);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid time: {} (expected YYYY-MM-DD)", value))?;
    let time = if end_of_range {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .context("Invalid time of day")?;
    Ok(time.and_utc().timestamp())
}
