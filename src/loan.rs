//! Amortising loan maths and the loan finance calculator.

use crate::format::{cost_per_pay_cycle, format_currency};
use crate::models::{ComparisonMethod, ComparisonResult, CostBreakdown, UserInputs};
use crate::policy::Policy;
use crate::running_costs::compute_running_costs;
use crate::safe_math::safe_divide;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Repayment figures for a fixed-rate loan with monthly repayments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSchedule {
    pub monthly_payment: f64,
    pub total_repayments: f64,
    pub total_interest: f64,
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// Fully amortises `principal` over `months` at `annual_rate_percent`.
///
/// A zero rate repays in equal straight-line instalments.  A non-positive
/// principal needs no repayments and reports the principal itself as the
/// amount repaid.
pub fn amortize(principal: f64, annual_rate_percent: f64, months: u32) -> LoanSchedule {
    if principal <= 0.0 {
        return LoanSchedule {
            monthly_payment: 0.0,
            total_repayments: principal,
            total_interest: 0.0,
        };
    }
    amortize_to_residual(principal, 0.0, annual_rate_percent, months)
}

/// Amortises `financed` down to a balloon of `residual` due after the
/// final instalment.  The residual itself is not part of
/// `total_repayments`.
pub fn amortize_to_residual(
    financed: f64,
    residual: f64,
    annual_rate_percent: f64,
    months: u32,
) -> LoanSchedule {
    let r = monthly_rate(annual_rate_percent);
    let n = f64::from(months);
    let amortised = financed - residual;

    let (monthly_payment, total_repayments) = if r > 0.0 {
        // Written against 1/growth so a horizon long enough to overflow
        // `growth` tends to interest-only instalments instead of zero.
        let growth = (1.0 + r).powf(n);
        let discount = if growth.is_finite() { growth.recip() } else { 0.0 };
        let payment = (financed - residual * discount) * safe_divide(r, 1.0 - discount);
        (payment, payment * n)
    } else {
        (safe_divide(amortised, n), amortised)
    };

    LoanSchedule {
        monthly_payment,
        total_repayments,
        // Rounding can leave a hair below zero.
        total_interest: (total_repayments - amortised).max(0.0),
    }
}

/// Loan finance: deposit up front, the balance repaid monthly over the
/// ownership horizon.
pub fn compute_loan_finance(inputs: &UserInputs, policy: &Policy) -> ComparisonResult {
    let inputs = inputs.sanitized();
    let base = compute_running_costs(&inputs, policy);
    finance_from(&inputs, &base)
}

pub(crate) fn finance_from(inputs: &UserInputs, base: &CostBreakdown) -> ComparisonResult {
    let years = inputs.years();
    let principal = inputs.drive_away_price - inputs.finance_deposit;
    let schedule = amortize(
        principal,
        inputs.finance_interest_rate,
        inputs.ownership_years.saturating_mul(12),
    );

    // Resale is informational only; it is not netted off.
    let total_lifetime_cost =
        inputs.finance_deposit + schedule.total_repayments + base.running_total();
    debug!(principal, ?schedule, total_lifetime_cost, "loan finance");

    ComparisonResult {
        method: ComparisonMethod::Finance,
        total_lifetime_cost,
        cost_per_year: safe_divide(total_lifetime_cost, years),
        cost_per_pay_cycle: cost_per_pay_cycle(
            total_lifetime_cost,
            inputs.ownership_years,
            inputs.pay_frequency,
        ),
        breakdown: CostBreakdown {
            monthly_payment: Some(schedule.monthly_payment),
            interest: Some(schedule.total_interest),
            ..base.clone()
        },
        key_insight: format!(
            "{} in interest over {} years.",
            format_currency(schedule.total_interest),
            inputs.ownership_years
        ),
        take_home_pay: None,
    }
}
