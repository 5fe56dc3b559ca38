//! Falling Trench
//!
//! Mirror image of Rising Peak on the buy side. Once the smoothed buy price
//! drops below the activation threshold a band is stored with its upper edge
//! at the threshold and its lower edge just below the current buy price, and a
//! buy order for the whole USD balance rests at the lower edge. The band
//! ratchets down with the price; when the price climbs back over the upper
//! edge the remaining USD is spent.
//!
//! The band never moves up.

use tracing::{debug, info};

use super::{Rule, FALLING_TRENCH_BAND};
use crate::decision::{Context, Decision};
use crate::error::Result;
use crate::money::round2;
use crate::snapshot::Data;
use crate::types::Band;

const RULE: Rule = Rule::FallingTrench;

pub fn decision() -> Decision {
    Decision::new(RULE.name(), condition, action, true)
}

/// Only returns true once the buy price climbs over an active band; creating
/// or lowering the band happens here as a side effect.
pub fn condition(data: &Data, ctx: &mut Context<'_>) -> Result<bool> {
    if !ctx.params.is_enabled(RULE) {
        return Ok(false);
    }
    if data.usd_balance <= ctx.params.falling_trench_min_usd {
        // The resting buy filled; a band must not outlive the USD it tracked
        if ctx.bands.band(FALLING_TRENCH_BAND)?.is_some() {
            ctx.bands.delete_band(FALLING_TRENCH_BAND)?;
            info!(rule = %RULE, "USD ${} at or below minimum. Band dropped", data.usd_balance);
        }
        return Ok(false);
    }

    let threshold = ctx.params.falling_trench_activation_threshold;
    let factor = ctx.params.falling_trench_lower_limit_factor;

    let band = match ctx.bands.band(FALLING_TRENCH_BAND)? {
        Some(band) => band,
        None => {
            if data.avg_buy < threshold {
                let band = Band::new(data.buy * factor, threshold);
                ctx.bands.set_band(FALLING_TRENCH_BAND, &band)?;
                info!(rule = %RULE, "Band activated at {}", band);
                place_buy(data, ctx, &band)?;
            } else {
                debug!(rule = %RULE, "avg buy ${} above activation ${}", data.avg_buy, threshold);
            }
            return Ok(false);
        }
    };

    if data.buy > band.upper {
        info!(rule = %RULE, "Buy ${} rose above band {}", data.buy, band);
        return Ok(true);
    }

    let delta = round2(band.lower - data.buy * factor);
    if delta > 0.0 {
        let lowered = band.shifted(-delta);
        ctx.bands.set_band(FALLING_TRENCH_BAND, &lowered)?;
        info!(rule = %RULE, "Band lowered by ${} to {}", delta, lowered);
        place_buy(data, ctx, &lowered)?;
    } else {
        debug!(rule = %RULE, "Holding band {} at buy ${}", band, data.buy);
    }
    Ok(false)
}

/// Replace any resting order with one buy spending the whole USD balance at the lower edge
fn place_buy(data: &Data, ctx: &mut Context<'_>, band: &Band) -> Result<()> {
    ctx.exchange.cancel_all_orders()?;
    ctx.executor
        .usd_buy_order(ctx.exchange, data.usd_balance, round2(band.lower))?;
    Ok(())
}

/// Spend the remaining USD; the band and the new purchases are settled once it completes
pub fn action(_data: &Data, ctx: &mut Context<'_>) -> Result<()> {
    info!(rule = %RULE, "Acquiring");
    let outcome = ctx.executor.acquire(ctx.exchange)?;
    if outcome.is_completed() {
        ctx.bands.delete_band(FALLING_TRENCH_BAND)?;
        ctx.history.sync_transactions(ctx.exchange)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Exchange;
    use crate::rules::testing::Harness;
    use crate::store::BandStore;
    use crate::types::Side;
    use approx::assert_relative_eq;

    fn data(avg_buy: f64, buy: f64, usd: f64) -> Data {
        Data {
            buy,
            sell: buy - 1.0,
            avg_buy,
            usd_balance: usd,
            ..Default::default()
        }
    }

    /// Ask at `buy`, $1000 to spend
    fn harness(buy: f64) -> Harness {
        Harness::at(buy - 1.0, 1000.0, 0.0)
    }

    #[test]
    fn test_activation_creates_band_and_buy_order() {
        let mut h = harness(400.0);

        let fired = h.with(|ctx| condition(&data(405.0, 400.0, 1000.0), ctx)).unwrap();

        assert!(!fired);
        let band = h.bands.band(FALLING_TRENCH_BAND).unwrap().unwrap();
        assert_relative_eq!(band.lower, 396.0);
        assert_eq!(band.upper, 410.0);

        let placed = h.exchange.placed_orders();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, Side::Buy);
        assert_eq!(placed[0].price, 396.0);
        assert!(placed[0].amount * 396.0 * 1.005 <= 1000.0);
    }

    #[test]
    fn test_band_ratchets_down_only() {
        let mut h = harness(400.0);
        let mut bands = Vec::new();

        for buy in [400.0, 395.0, 397.0, 390.0, 392.0] {
            h.with(|ctx| condition(&data(405.0, buy, 1000.0), ctx)).unwrap();
            bands.push(h.bands.band(FALLING_TRENCH_BAND).unwrap().unwrap());
        }

        for pair in bands.windows(2) {
            assert!(pair[1].lower <= pair[0].lower);
            assert!(pair[1].upper <= pair[0].upper);
        }
        // 395 * 0.99 = 391.05, shift 4.95
        assert_relative_eq!(bands[1].lower, 391.05);
        assert_relative_eq!(bands[1].upper, 405.05);
        assert_eq!(h.exchange.placed_orders().len(), 3);
        assert_eq!(h.exchange.open_orders().unwrap().len(), 1);
    }

    #[test]
    fn test_climb_over_band_fires_and_acquires() {
        let mut h = harness(412.0);
        h.bands.set_band(FALLING_TRENCH_BAND, &Band::new(396.0, 410.0)).unwrap();
        let snapshot = data(405.0, 412.0, 1000.0);

        assert!(h.with(|ctx| condition(&snapshot, ctx)).unwrap());
        h.with(|ctx| action(&snapshot, ctx)).unwrap();

        assert!(h.exchange.balance().unwrap().usd < 1.0);
        assert_eq!(h.bands.band(FALLING_TRENCH_BAND).unwrap(), None);
        assert_eq!(h.history.last_trade(Side::Buy).unwrap().unwrap().rate, 412.0);
    }

    #[test]
    fn test_needs_minimum_usd() {
        let mut h = harness(400.0);

        assert!(!h.with(|ctx| condition(&data(405.0, 400.0, 10.0), ctx)).unwrap());
        assert_eq!(h.bands.band(FALLING_TRENCH_BAND).unwrap(), None);
    }

    #[test]
    fn test_band_dropped_once_usd_is_spent() {
        let mut h = harness(412.0);
        h.bands.set_band(FALLING_TRENCH_BAND, &Band::new(396.0, 410.0)).unwrap();

        assert!(!h.with(|ctx| condition(&data(405.0, 412.0, 3.5), ctx)).unwrap());
        assert_eq!(h.bands.band(FALLING_TRENCH_BAND).unwrap(), None);
        assert!(h.exchange.placed_orders().is_empty());
    }

    #[test]
    fn test_no_activation_above_threshold() {
        let mut h = harness(415.0);

        assert!(!h.with(|ctx| condition(&data(411.0, 415.0, 1000.0), ctx)).unwrap());
        assert!(h.exchange.placed_orders().is_empty());
    }
}
