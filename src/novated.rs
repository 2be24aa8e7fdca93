//! Novated lease (salary packaging) calculator.
//!
//! A novated lease is costed in stages:
//!
//! 1. The drive-away price is split into the GST-inclusive vehicle base
//!    value, stamp duty and registration.
//! 2. GST is stripped from the vehicle and from the GST-bearing running
//!    costs (everything except rego/CTP); the employer claims it back as
//!    an input tax credit.
//! 3. The ex-GST vehicle plus on-road costs is financed down to the ATO
//!    minimum residual, which falls due as a balloon at term end.
//! 4. FBT is neutralised with the employee contribution method: the
//!    statutory fringe benefit value is paid from post-tax salary.
//! 5. Lease instalments, ex-GST running costs and the admin fee come out
//!    of pre-tax salary, and the resulting income tax saving offsets part
//!    of the take-home pay reduction.

use crate::format::{cost_per_pay_cycle, format_currency, pay_cycle_amount};
use crate::loan::{amortize_to_residual, LoanSchedule};
use crate::models::{
    ComparisonMethod, ComparisonResult, CostBreakdown, TakeHomePayImpact, TaxCalculation,
    UserInputs,
};
use crate::policy::{Policy, TaxSavingBasis};
use crate::running_costs::compute_running_costs;
use crate::safe_math::{non_negative, safe_divide};
use crate::tax::compute_tax;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// GST embedded in a GST-inclusive amount (1/11th at a 10% rate).
pub fn gst_component(gst_inclusive: f64, gst_rate: f64) -> f64 {
    gst_inclusive * safe_divide(gst_rate, 1.0 + gst_rate)
}

/// Components bundled into a drive-away price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDecomposition {
    /// GST-inclusive vehicle value, excluding on-road costs.
    pub vehicle_base_value: f64,
    pub stamp_duty: f64,
    pub registration: f64,
    pub gst_on_vehicle: f64,
    pub vehicle_price_ex_gst: f64,
}

/// Solves `drive_away = base + base * stamp_duty_rate + rego` for the
/// vehicle base value, then extracts its GST.
///
/// The rego and stamp-duty figures are jurisdiction averages, so the
/// split is an estimate.
pub fn decompose_price(drive_away_price: f64, policy: &Policy) -> PriceDecomposition {
    let registration = policy.onroad_rego_estimate;
    let vehicle_base_value = non_negative(safe_divide(
        drive_away_price - registration,
        1.0 + policy.stamp_duty_rate,
    ));
    let gst_on_vehicle = gst_component(vehicle_base_value, policy.gst_rate);
    PriceDecomposition {
        vehicle_base_value,
        stamp_duty: vehicle_base_value * policy.stamp_duty_rate,
        registration,
        gst_on_vehicle,
        vehicle_price_ex_gst: vehicle_base_value - gst_on_vehicle,
    }
}

/// Every intermediate figure of a novated lease, annualised unless the
/// name says otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovatedPackage {
    pub price: PriceDecomposition,
    pub financed_amount: f64,
    pub residual_value: f64,
    pub lease: LoanSchedule,
    pub annual_lease_payment: f64,
    pub annual_running_ex_gst: f64,
    /// GST on the running costs, recovered as an input tax credit.
    pub annual_running_gst_credit: f64,
    pub annual_admin_fee: f64,
    pub annual_pre_tax_deduction: f64,
    /// Employee contribution (ECM); zero when FBT does not apply.
    pub annual_post_tax_deduction: f64,
    /// GST-inclusive rental the employer pays on the employee's behalf.
    pub gross_annual_rental: f64,
    pub baseline_tax: TaxCalculation,
    pub packaged_tax: TaxCalculation,
    pub annual_tax_saving: f64,
    pub annual_take_home_reduction: f64,
    pub total_tax_saving: f64,
    pub total_gst_savings: f64,
}

/// Statutory fringe benefit value covered by the employee contribution.
pub fn employee_contribution(inputs: &UserInputs, base_value: f64, policy: &Policy) -> f64 {
    if !policy.fbt_applies(inputs.fuel_type) {
        return 0.0;
    }
    let statutory = base_value * policy.fbt_statutory_rate;
    if inputs.work_use_over_50 {
        statutory * policy.operating_cost_reduction
    } else {
        statutory
    }
}

fn tax_saving(baseline: &TaxCalculation, packaged: &TaxCalculation, basis: TaxSavingBasis) -> f64 {
    match basis {
        TaxSavingBasis::IncomeTaxOnly => baseline.income_tax - packaged.income_tax,
        TaxSavingBasis::IncomeTaxAndLevy => {
            (baseline.income_tax + baseline.medicare_levy)
                - (packaged.income_tax + packaged.medicare_levy)
        }
    }
}

/// Builds the full package from sanitised inputs and their running costs.
pub fn novated_package(
    inputs: &UserInputs,
    base: &CostBreakdown,
    policy: &Policy,
) -> NovatedPackage {
    let years = inputs.years();
    let price = decompose_price(inputs.drive_away_price, policy);

    let gst_bearing_annual = safe_divide(base.gst_bearing_total(), years);
    let non_gst_annual = safe_divide(base.rego_ctp, years);
    let annual_running_gst_credit = gst_component(gst_bearing_annual, policy.gst_rate);
    let annual_running_ex_gst = gst_bearing_annual - annual_running_gst_credit + non_gst_annual;

    let financed_amount = price.vehicle_price_ex_gst + price.stamp_duty + price.registration;
    let residual_value = financed_amount * policy.residual_rate(inputs.ownership_years);
    let lease = amortize_to_residual(
        financed_amount,
        residual_value,
        inputs.novated_interest_rate,
        inputs.ownership_years.saturating_mul(12),
    );
    let annual_lease_payment = safe_divide(lease.total_repayments, years);

    let annual_admin_fee = non_negative(policy.novated_admin_fee_annual);
    let annual_post_tax_deduction = employee_contribution(inputs, price.vehicle_base_value, policy);
    let annual_pre_tax_deduction = annual_lease_payment + annual_running_ex_gst + annual_admin_fee;
    let gross_annual_rental = annual_lease_payment
        + gst_bearing_annual
        + non_gst_annual
        + annual_admin_fee
        + annual_post_tax_deduction;

    let baseline_tax = compute_tax(inputs.annual_salary, policy);
    let packaged_tax = compute_tax(
        (inputs.annual_salary - annual_pre_tax_deduction).max(0.0),
        policy,
    );
    let annual_tax_saving = tax_saving(&baseline_tax, &packaged_tax, policy.tax_saving_basis);

    NovatedPackage {
        price,
        financed_amount,
        residual_value,
        lease,
        annual_lease_payment,
        annual_running_ex_gst,
        annual_running_gst_credit,
        annual_admin_fee,
        annual_pre_tax_deduction,
        annual_post_tax_deduction,
        gross_annual_rental,
        baseline_tax,
        packaged_tax,
        annual_tax_saving,
        annual_take_home_reduction: annual_pre_tax_deduction - annual_tax_saving
            + annual_post_tax_deduction,
        total_tax_saving: annual_tax_saving * years,
        total_gst_savings: price.gst_on_vehicle + annual_running_gst_credit * years,
    }
}

/// Salary-packaged novated lease.
pub fn compute_novated_lease(inputs: &UserInputs, policy: &Policy) -> ComparisonResult {
    let inputs = inputs.sanitized();
    let base = compute_running_costs(&inputs, policy);
    novated_from(&inputs, &base, policy)
}

pub(crate) fn novated_from(
    inputs: &UserInputs,
    base: &CostBreakdown,
    policy: &Policy,
) -> ComparisonResult {
    let years = inputs.years();
    let frequency = inputs.pay_frequency;
    let package = novated_package(inputs, base, policy);

    let total_lifetime_cost = package.annual_take_home_reduction * years + package.residual_value;
    debug!(
        financed = package.financed_amount,
        residual = package.residual_value,
        ecm = package.annual_post_tax_deduction,
        total_lifetime_cost,
        "novated lease"
    );

    let before = pay_cycle_amount(package.baseline_tax.net_take_home_pay, frequency);
    let reduction = pay_cycle_amount(package.annual_take_home_reduction, frequency);
    let take_home_pay = TakeHomePayImpact {
        before,
        after: before - reduction,
        reduction,
        tax_savings: package.total_tax_saving,
        pre_tax_deduction: pay_cycle_amount(package.annual_pre_tax_deduction, frequency),
        post_tax_deduction: pay_cycle_amount(package.annual_post_tax_deduction, frequency),
    };

    let combined_savings = package.total_tax_saving + package.total_gst_savings;
    let key_insight = if inputs.fuel_type.is_electric() && !policy.fbt_applies(inputs.fuel_type) {
        format!(
            "FBT-exempt EV! Save {} (tax + GST).",
            format_currency(combined_savings)
        )
    } else {
        format!(
            "Save {} ({} tax + {} GST).",
            format_currency(combined_savings),
            format_currency(package.total_tax_saving),
            format_currency(package.total_gst_savings)
        )
    };

    let ecm_total = package.annual_post_tax_deduction * years;
    ComparisonResult {
        method: ComparisonMethod::Novated,
        total_lifetime_cost,
        cost_per_year: safe_divide(total_lifetime_cost, years),
        cost_per_pay_cycle: cost_per_pay_cycle(
            total_lifetime_cost,
            inputs.ownership_years,
            frequency,
        ),
        breakdown: CostBreakdown {
            monthly_payment: Some(package.lease.monthly_payment),
            interest: Some(package.lease.total_interest),
            fbt: Some(ecm_total),
            balloon_payment: Some(package.residual_value),
            gst_savings_vehicle: Some(package.price.gst_on_vehicle),
            gst_savings_running: Some(package.annual_running_gst_credit * years),
            pre_tax_deduction: Some(package.annual_pre_tax_deduction * years),
            post_tax_deduction: Some(ecm_total),
            ..base.clone()
        },
        key_insight,
        take_home_pay: Some(take_home_pay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FuelType;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn package_for(inputs: &UserInputs, policy: &Policy) -> NovatedPackage {
        let inputs = inputs.sanitized();
        let base = compute_running_costs(&inputs, policy);
        novated_package(&inputs, &base, policy)
    }

    #[test]
    fn gst_is_one_eleventh() {
        assert_approx(gst_component(110.0, 0.10), 10.0);
        assert_eq!(gst_component(0.0, 0.10), 0.0);
    }

    #[test]
    fn price_decomposition_reassembles() {
        let policy = Policy::default();
        let price = decompose_price(45_000.0, &policy);
        assert_approx(price.vehicle_base_value, 44_100.0 / 1.033);
        assert_approx(
            price.vehicle_base_value + price.stamp_duty + price.registration,
            45_000.0,
        );
        assert_approx(
            price.vehicle_price_ex_gst + price.gst_on_vehicle,
            price.vehicle_base_value,
        );
    }

    #[test]
    fn price_below_onroads_floors_at_zero() {
        let price = decompose_price(500.0, &Policy::default());
        assert_eq!(price.vehicle_base_value, 0.0);
        assert_eq!(price.gst_on_vehicle, 0.0);
    }

    #[test]
    fn residual_follows_ato_table() {
        let policy = Policy::default();
        let package = package_for(&UserInputs::default(), &policy);
        assert_approx(package.residual_value, package.financed_amount * 0.47);
        assert!(package.lease.monthly_payment > 0.0);
    }

    #[test]
    fn ecm_is_statutory_fifth_of_base_value() {
        let policy = Policy::default();
        let package = package_for(&UserInputs::default(), &policy);
        assert_approx(
            package.annual_post_tax_deduction,
            package.price.vehicle_base_value * 0.20,
        );

        let work_use = UserInputs {
            work_use_over_50: true,
            ..UserInputs::default()
        };
        let halved = package_for(&work_use, &policy);
        assert_approx(
            halved.annual_post_tax_deduction,
            package.annual_post_tax_deduction / 2.0,
        );
    }

    #[test]
    fn ev_exemption_zeroes_ecm_unless_policy_lifts_it() {
        let ev = UserInputs {
            fuel_type: FuelType::Electric,
            ..UserInputs::default()
        };
        let mut policy = Policy::default();
        let result = compute_novated_lease(&ev, &policy);
        assert_eq!(result.breakdown.fbt, Some(0.0));
        assert_eq!(result.breakdown.post_tax_deduction, Some(0.0));
        assert!(result.key_insight.starts_with("FBT-exempt EV!"));

        policy.ev_fbt_exempt = false;
        let result = compute_novated_lease(&ev, &policy);
        assert!(result.breakdown.fbt.unwrap() > 0.0);
        assert!(result.key_insight.starts_with("Save "));
    }

    #[test]
    fn payroll_split_reconstructs_gross_rental() {
        let policy = Policy {
            novated_admin_fee_annual: 300.0,
            ..Policy::default()
        };
        let package = package_for(&UserInputs::default(), &policy);
        assert_approx(
            package.annual_pre_tax_deduction
                + package.annual_post_tax_deduction
                + package.annual_running_gst_credit,
            package.gross_annual_rental,
        );
        assert_eq!(package.annual_admin_fee, 300.0);
    }

    #[test]
    fn gst_credit_excludes_registration() {
        let policy = Policy::default();
        let inputs = UserInputs::default();
        let base = compute_running_costs(&inputs, &policy);
        let package = package_for(&inputs, &policy);
        assert_approx(
            package.annual_running_gst_credit,
            base.gst_bearing_total() / 3.0 / 11.0,
        );
        assert_approx(
            package.annual_running_ex_gst,
            base.gst_bearing_total() / 3.0 * 10.0 / 11.0 + 900.0,
        );
    }

    #[test]
    fn tax_saving_basis_changes_saving() {
        let with_levy = package_for(&UserInputs::default(), &Policy::default());
        let tax_only_policy = Policy {
            tax_saving_basis: TaxSavingBasis::IncomeTaxOnly,
            ..Policy::default()
        };
        let tax_only = package_for(&UserInputs::default(), &tax_only_policy);
        assert_approx(
            with_levy.annual_tax_saving - tax_only.annual_tax_saving,
            with_levy.annual_pre_tax_deduction * 0.02,
        );
    }

    #[test]
    fn lifetime_cost_is_take_home_reduction_plus_balloon() {
        let policy = Policy::default();
        let inputs = UserInputs::default();
        let result = compute_novated_lease(&inputs, &policy);
        let package = package_for(&inputs, &policy);
        assert_approx(
            result.total_lifetime_cost,
            package.annual_take_home_reduction * 3.0 + package.residual_value,
        );
        assert_approx(
            package.annual_take_home_reduction,
            package.annual_pre_tax_deduction - package.annual_tax_saving
                + package.annual_post_tax_deduction,
        );

        let impact = result.take_home_pay.unwrap();
        assert_approx(impact.before, package.baseline_tax.net_take_home_pay / 26.0);
        assert_approx(impact.after, impact.before - impact.reduction);
        assert_approx(impact.tax_savings, package.annual_tax_saving * 3.0);
    }

    #[test]
    fn deduction_larger_than_salary_floors_taxable_income() {
        let inputs = UserInputs {
            annual_salary: 5_000.0,
            ..UserInputs::default()
        };
        let package = package_for(&inputs, &Policy::default());
        assert_eq!(package.packaged_tax.gross_income, 0.0);
        assert_eq!(package.annual_tax_saving, 0.0);
    }
}
