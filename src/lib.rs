//! OODA Trader
//!
//! Rule-driven BTC/USD trading against Bitstamp. Each invocation observes the
//! market and the account, evaluates an ordered chain of trading rules and,
//! when one fires, sells or buys through a loop that keeps a single limit
//! order tracking the price until the balance is exhausted.

pub mod averages;
pub mod config;
pub mod decision;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod history;
pub mod money;
pub mod rules;
pub mod snapshot;
pub mod store;
pub mod types;

pub use config::Config;
pub use decision::{Context, CycleReport, Decision, DecisionEngine};
pub use error::{Result, TradeError};
pub use exchange::Exchange;
pub use execution::{ExecutionOutcome, OrderExecutor};
pub use snapshot::Data;
pub use store::BandStore;
pub use types::*;
