//! Minimum Profit
//!
//! Once the smoothed sell price has been well above the last purchase price
//! and has since fallen back into a narrow band just above it, sell before
//! the remaining profit disappears.

use tracing::debug;

use super::{liquidate, Rule};
use crate::decision::{Context, Decision};
use crate::error::Result;
use crate::snapshot::Data;

const RULE: Rule = Rule::MinimumProfit;

pub fn decision() -> Decision {
    Decision::new(RULE.name(), condition, action, true)
}

pub fn condition(data: &Data, ctx: &mut Context<'_>) -> Result<bool> {
    if !ctx.params.is_enabled(RULE) || data.btc_balance <= 0.0 {
        return Ok(false);
    }

    let p = ctx.params;
    let lower = p.min_profit_band_lower_factor * data.last_buy_price;
    let upper = p.min_profit_band_upper_factor * data.last_buy_price;
    let trigger = p.min_profit_trigger_threshold * data.last_buy_price;

    let in_band = data.sell > lower && data.sell < upper;
    let peak = data.max_weighted_sell();
    debug!(
        rule = %RULE,
        "sell ${} in (${}, ${}): {}, smoothed peak {:?} vs ${}",
        data.sell, lower, upper, in_band, peak, trigger
    );

    Ok(in_band && peak.is_some_and(|peak| peak > trigger))
}

pub fn action(_data: &Data, ctx: &mut Context<'_>) -> Result<()> {
    liquidate(RULE, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::Harness;

    fn data(sell: f64, btc: f64, peaks: Vec<f64>) -> Data {
        Data {
            sell,
            buy: sell + 1.0,
            btc_balance: btc,
            last_buy_price: 400.0,
            weighted_sell_prices: peaks,
            ..Default::default()
        }
    }

    #[test]
    fn test_triggers_after_missed_peak() {
        let mut h = Harness::at(405.0, 0.0, 1.0);
        // band (403.2, 408), trigger 410
        let snapshot = data(405.0, 1.0, vec![402.0, 411.5, 406.0]);
        assert!(h.with(|ctx| condition(&snapshot, ctx)).unwrap());
    }

    #[test]
    fn test_requires_peak_above_trigger() {
        let mut h = Harness::at(405.0, 0.0, 1.0);
        let snapshot = data(405.0, 1.0, vec![402.0, 409.0, 406.0]);
        assert!(!h.with(|ctx| condition(&snapshot, ctx)).unwrap());
        assert!(!h.with(|ctx| condition(&data(405.0, 1.0, vec![]), ctx)).unwrap());
    }

    #[test]
    fn test_requires_sell_inside_band() {
        let mut h = Harness::at(409.0, 0.0, 1.0);
        let peaks = vec![415.0];
        assert!(!h.with(|ctx| condition(&data(409.0, 1.0, peaks.clone()), ctx)).unwrap());
        assert!(!h.with(|ctx| condition(&data(402.0, 1.0, peaks), ctx)).unwrap());
    }

    #[test]
    fn test_inert_without_btc_or_disabled() {
        let mut h = Harness::at(405.0, 100.0, 0.0);
        let peaks = vec![415.0];
        assert!(!h.with(|ctx| condition(&data(405.0, 0.0, peaks.clone()), ctx)).unwrap());

        h.params.active_min_profit = false;
        assert!(!h.with(|ctx| condition(&data(405.0, 1.0, peaks), ctx)).unwrap());
    }
}
