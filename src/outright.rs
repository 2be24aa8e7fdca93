//! Outright cash purchase.

use crate::format::cost_per_pay_cycle;
use crate::models::{ComparisonMethod, ComparisonResult, CostBreakdown, UserInputs};
use crate::policy::Policy;
use crate::running_costs::compute_running_costs;
use crate::safe_math::safe_divide;
use tracing::debug;

/// Pays the drive-away price in cash, then the running costs.
pub fn compute_outright(inputs: &UserInputs, policy: &Policy) -> ComparisonResult {
    let inputs = inputs.sanitized();
    let base = compute_running_costs(&inputs, policy);
    outright_from(&inputs, &base)
}

pub(crate) fn outright_from(inputs: &UserInputs, base: &CostBreakdown) -> ComparisonResult {
    // Pure cash outflow: resale value is reported but never subtracted,
    // keeping all three methods on the same footing.
    let total_lifetime_cost = inputs.drive_away_price + base.running_total();
    debug!(total_lifetime_cost, "outright purchase");

    ComparisonResult {
        method: ComparisonMethod::Outright,
        total_lifetime_cost,
        cost_per_year: safe_divide(total_lifetime_cost, inputs.years()),
        cost_per_pay_cycle: cost_per_pay_cycle(
            total_lifetime_cost,
            inputs.ownership_years,
            inputs.pay_frequency,
        ),
        breakdown: base.clone(),
        key_insight: "No interest paid. Full ownership from day one.".to_string(),
        take_home_pay: None,
    }
}
