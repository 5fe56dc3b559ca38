//! Rising Peak
//!
//! Trailing sell band. Once the smoothed sell price crosses the activation
//! threshold a band is stored with its lower edge at the threshold and its
//! upper edge just above the current sell price, and a sell order rests at the
//! upper edge. While the price keeps rising the band ratchets up and the order
//! follows it; when the price falls through the lower edge everything is sold.
//!
//! The band never moves down.

use tracing::{debug, info};

use super::{liquidate, Rule, RISING_PEAK_BAND};
use crate::decision::{Context, Decision};
use crate::error::Result;
use crate::money::{chop_btc, round2};
use crate::snapshot::Data;
use crate::types::Band;

const RULE: Rule = Rule::RisingPeak;

pub fn decision() -> Decision {
    Decision::new(RULE.name(), condition, action, true)
}

/// Only returns true once the sell price breaks below an active band; creating
/// or raising the band happens here as a side effect.
pub fn condition(data: &Data, ctx: &mut Context<'_>) -> Result<bool> {
    if !ctx.params.is_enabled(RULE) {
        return Ok(false);
    }
    if data.btc_balance <= 0.0 {
        // The resting sell filled; a band must not outlive the position it tracked
        if ctx.bands.band(RISING_PEAK_BAND)?.is_some() {
            ctx.bands.delete_band(RISING_PEAK_BAND)?;
            info!(rule = %RULE, "No BTC left. Band dropped");
        }
        return Ok(false);
    }

    let threshold = ctx.params.rising_peak_activation_threshold;
    let factor = ctx.params.rising_peak_upper_limit_factor;

    let band = match ctx.bands.band(RISING_PEAK_BAND)? {
        Some(band) => band,
        None => {
            if data.avg_sell > threshold {
                let band = Band::new(threshold, data.sell * factor);
                ctx.bands.set_band(RISING_PEAK_BAND, &band)?;
                info!(rule = %RULE, "Band activated at {}", band);
                place_sell(data, ctx, &band)?;
            } else {
                debug!(rule = %RULE, "avg sell ${} below activation ${}", data.avg_sell, threshold);
            }
            return Ok(false);
        }
    };

    if data.sell < band.lower {
        info!(rule = %RULE, "Sell ${} fell below band {}", data.sell, band);
        return Ok(true);
    }

    let delta = round2(data.sell * factor - band.upper);
    if delta > 0.0 {
        let raised = band.shifted(delta);
        ctx.bands.set_band(RISING_PEAK_BAND, &raised)?;
        info!(rule = %RULE, "Band raised by ${} to {}", delta, raised);
        place_sell(data, ctx, &raised)?;
    } else {
        debug!(rule = %RULE, "Holding band {} at sell ${}", band, data.sell);
    }
    Ok(false)
}

/// Replace any resting order with one sell for the whole balance at the upper edge
fn place_sell(data: &Data, ctx: &mut Context<'_>, band: &Band) -> Result<()> {
    ctx.exchange.cancel_all_orders()?;
    ctx.exchange
        .sell_order(chop_btc(data.btc_balance), round2(band.upper))?;
    Ok(())
}

pub fn action(_data: &Data, ctx: &mut Context<'_>) -> Result<()> {
    liquidate(RULE, ctx)
}
