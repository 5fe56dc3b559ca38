//! OODA trader - main entry point
//!
//! One-shot subcommands meant to be driven by cron:
//! - cycle: run one observe/decide/act cycle
//! - record: append the current quotes to the price history
//! - sync: pull completed trades into the price history
//! - status: show market, account and rule state
//! - purge / acquire: sell all BTC / spend all USD now
//! - params: inspect and edit the stored rule tunables
//! - extract: export price ticks to CSV

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "ooda-trader")]
#[command(about = "Rule-driven BTC/USD trading cycles against Bitstamp", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.json")]
    config: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one trading cycle
    Cycle {
        /// Evaluate against a simulated copy of the account; nothing is sent to the exchange
        #[arg(long)]
        dry_run: bool,
    },

    /// Record the current quotes as a price tick
    Record,

    /// Sync completed trades from the exchange
    Sync,

    /// Show prices, balances, open orders and bands
    Status,

    /// Sell all BTC (CAUTION - REAL MONEY!)
    Purge,

    /// Spend all USD on BTC (CAUTION - REAL MONEY!)
    Acquire,

    /// Inspect and edit rule parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },

    /// Export price ticks to CSV
    Extract {
        /// Start of the range (YYYY-MM-DD, "YYYY-MM-DD HH:MM:SS" or unix seconds)
        #[arg(long)]
        from: String,

        /// End of the range, inclusive
        #[arg(long)]
        to: String,

        /// Output CSV file
        #[arg(short, long, default_value = "prices.csv")]
        output: String,
    },
}

#[derive(Subcommand, Debug)]
enum ParamsAction {
    /// Print the effective parameters and every stored entry
    Dump,

    /// Store a tunable. E.g., "rising_peak_activation_threshold 432"
    Set { key: String, value: f64 },

    /// Flip a rule's enable flag. E.g., "active_rising_peak" or "rising_peak"
    Toggle { flag: String },

    /// Store the configured defaults for every tunable and flag
    Load,
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // Same format without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Cycle { .. } => "cycle",
        Commands::Record => "record",
        Commands::Sync => "sync",
        Commands::Status => "status",
        Commands::Purge => "purge",
        Commands::Acquire => "acquire",
        Commands::Params { .. } => "params",
        Commands::Extract { .. } => "extract",
    };

    setup_logging(cli.verbose, command_name)?;

    let config = cli.config.as_str();
    match cli.command {
        Commands::Cycle { dry_run } => commands::cycle::run(config, dry_run),
        Commands::Record => commands::record::run(config),
        Commands::Sync => commands::sync::run(config),
        Commands::Status => commands::status::run(config),
        Commands::Purge => commands::execute::purge(config),
        Commands::Acquire => commands::execute::acquire(config),
        Commands::Params { action } => match action {
            ParamsAction::Dump => commands::params::dump(config),
            ParamsAction::Set { key, value } => commands::params::set(config, &key, value),
            ParamsAction::Toggle { flag } => commands::params::toggle(config, &flag),
            ParamsAction::Load => commands::params::load(config),
        },
        Commands::Extract { from, to, output } => {
            commands::extract::run(config, &from, &to, &output)
        }
    }
}
