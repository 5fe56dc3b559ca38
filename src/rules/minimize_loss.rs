//! Minimize Loss: stop-loss relative to the price of the last purchase.

use tracing::debug;

use super::{liquidate, Rule};
use crate::decision::{Context, Decision};
use crate::error::Result;
use crate::snapshot::Data;

const RULE: Rule = Rule::MinimizeLoss;

pub fn decision() -> Decision {
    Decision::new(RULE.name(), condition, action, true)
}

pub fn condition(data: &Data, ctx: &mut Context<'_>) -> Result<bool> {
    if !ctx.params.is_enabled(RULE) || data.btc_balance <= 0.0 {
        return Ok(false);
    }

    let stop = ctx.params.minimize_loss_drop_factor * data.last_buy_price;
    debug!(rule = %RULE, "sell ${} vs stop ${}", data.sell, stop);
    Ok(data.sell < stop)
}

pub fn action(_data: &Data, ctx: &mut Context<'_>) -> Result<()> {
    liquidate(RULE, ctx)
}
