//! Comparison engine.
//!
//! The `engine` module turns one [`UserInputs`] snapshot into a
//! [`ComparisonResult`] per enabled acquisition method.  The running
//! costs are estimated once and shared by every calculator.  Each pass is
//! pure, so [`compare_batch`] uses the [`rayon`] crate to evaluate many
//! independent snapshots across CPU cores.

use crate::loan::finance_from;
use crate::models::{
    ComparisonMethod, ComparisonResult, EnabledMethods, TaxCalculation, UserInputs,
};
use crate::novated::novated_from;
use crate::outright::outright_from;
use crate::policy::Policy;
use crate::running_costs::compute_running_costs;
use crate::tax::compute_tax;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Runs every enabled calculator against the same input snapshot.
/// Results are ordered outright, finance, novated.
#[instrument(level = "debug", skip_all, fields(policy = %policy.id))]
pub fn compute_comparison(
    inputs: &UserInputs,
    enabled: EnabledMethods,
    policy: &Policy,
) -> Vec<ComparisonResult> {
    let inputs = inputs.sanitized();
    let base = compute_running_costs(&inputs, policy);

    let mut results = Vec::with_capacity(3);
    if enabled.outright {
        results.push(outright_from(&inputs, &base));
    }
    if enabled.finance {
        results.push(finance_from(&inputs, &base));
    }
    if enabled.novated {
        results.push(novated_from(&inputs, &base, policy));
    }
    debug!(methods = results.len(), "comparison complete");
    results
}

/// Method with the smallest total lifetime cost; the first wins a tie.
pub fn lowest_cost_method(results: &[ComparisonResult]) -> Option<ComparisonMethod> {
    lowest_by(results, |r| r.total_lifetime_cost)
}

/// Method that takes the least out of each pay cycle.
pub fn lowest_pay_impact_method(results: &[ComparisonResult]) -> Option<ComparisonMethod> {
    lowest_by(results, ComparisonResult::pay_cycle_impact)
}

fn lowest_by(
    results: &[ComparisonResult],
    key: impl Fn(&ComparisonResult) -> f64,
) -> Option<ComparisonMethod> {
    let (first, rest) = results.split_first()?;
    let lowest = rest
        .iter()
        .fold(first, |min, r| if key(r) < key(min) { r } else { min });
    Some(lowest.method)
}

/// Everything a results panel needs for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub policy: String,
    pub results: Vec<ComparisonResult>,
    pub lowest_cost: Option<ComparisonMethod>,
    pub lowest_pay_impact: Option<ComparisonMethod>,
    /// The salary's tax position without any packaging.
    pub tax: TaxCalculation,
}

/// Compares the methods enabled in `inputs.comparison_methods`.
pub fn compare(inputs: &UserInputs, policy: &Policy) -> ComparisonReport {
    let results = compute_comparison(inputs, inputs.comparison_methods, policy);
    ComparisonReport {
        policy: policy.id.clone(),
        lowest_cost: lowest_cost_method(&results),
        lowest_pay_impact: lowest_pay_impact_method(&results),
        tax: compute_tax(inputs.annual_salary, policy),
        results,
    }
}

/// A labelled input snapshot for batch evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub label: String,
    pub inputs: UserInputs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub label: String,
    pub report: ComparisonReport,
}

/// Evaluates every scenario in parallel.  Output order matches input.
pub fn compare_batch(scenarios: Vec<Scenario>, policy: &Policy) -> Vec<ScenarioReport> {
    scenarios
        .into_par_iter()
        .map(|scenario| ScenarioReport {
            report: compare(&scenario.inputs, policy),
            label: scenario.label,
        })
        .collect()
}
