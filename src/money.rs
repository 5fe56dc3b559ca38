//! Price and amount arithmetic
//!
//! Balances and quotes are carried as `f64` the way the exchange reports them.
//! Anything that ends up on the wire or is compared against stored band edges
//! goes through `Decimal` so the rounding is exact.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places the exchange accepts for BTC amounts
pub const BTC_DECIMALS: u32 = 8;

/// Decimal places the exchange accepts for USD prices
pub const USD_DECIMALS: u32 = 2;

/// USD kept back when sizing a buy so the exchange's own fee calculation
/// never rounds the total above the available balance
const FEE_ROUNDING_MARGIN: f64 = 0.01;

fn to_decimal(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}

/// Floor a BTC amount to 8 decimal places
pub fn chop_btc(btc: f64) -> f64 {
    to_decimal(btc)
        .map(|d| d.round_dp_with_strategy(BTC_DECIMALS, RoundingStrategy::ToZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

/// Round a USD value to cents
pub fn round2(value: f64) -> f64 {
    to_decimal(value)
        .map(|d| d.round_dp_with_strategy(USD_DECIMALS, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// USD that can be spent on BTC once the proportional fee is taken out.
///
/// Solves `(1 + fee/100) * x = usd` for `x`, minus a one-cent margin.
pub fn adjusted_usd_amount(usd: f64, fee_percent: f64) -> f64 {
    usd / (1.0 + fee_percent / 100.0) - FEE_ROUNDING_MARGIN
}

/// BTC purchasable for `usd` at `price`, fee included and floored to 8 dp
pub fn btc_for_usd(usd: f64, fee_percent: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    let amount = adjusted_usd_amount(usd, fee_percent);
    if amount <= 0.0 {
        return 0.0;
    }
    chop_btc(amount / price)
}

/// Wire representation of a BTC amount
pub fn format_amount(btc: f64) -> String {
    match to_decimal(btc) {
        Some(d) => format!(
            "{:.8}",
            d.round_dp_with_strategy(BTC_DECIMALS, RoundingStrategy::ToZero)
        ),
        None => "0.00000000".to_string(),
    }
}

/// Wire representation of a USD price
pub fn format_price(price: f64) -> String {
    match to_decimal(price) {
        Some(d) => format!(
            "{:.2}",
            d.round_dp_with_strategy(USD_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => "0.00".to_string(),
    }
}
