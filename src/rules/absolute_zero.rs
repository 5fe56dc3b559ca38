//! Absolute Zero: liquidate everything once the sell price falls below a hard floor.

use tracing::debug;

use super::{liquidate, Rule};
use crate::decision::{Context, Decision};
use crate::error::Result;
use crate::snapshot::Data;

const RULE: Rule = Rule::AbsoluteZero;

pub fn decision() -> Decision {
    Decision::new(RULE.name(), condition, action, true)
}

pub fn condition(data: &Data, ctx: &mut Context<'_>) -> Result<bool> {
    if !ctx.params.is_enabled(RULE) || data.btc_balance <= 0.0 {
        return Ok(false);
    }

    let threshold = ctx.params.absolute_zero_min_threshold;
    debug!(rule = %RULE, "sell ${} vs floor ${}", data.sell, threshold);
    Ok(data.sell < threshold)
}

pub fn action(_data: &Data, ctx: &mut Context<'_>) -> Result<()> {
    liquidate(RULE, ctx)
}
