//! Income tax calculation.
//!
//! The `tax` module defines the [`TaxCalculator`] abstraction and the
//! progressive bracket calculator used for Australian residents.  The
//! bracket table itself comes from the active [`Policy`], so the same
//! code serves every financial year.

use crate::models::TaxCalculation;
use crate::policy::Policy;
use crate::safe_math::non_negative;

/// A tax calculator turns an annual gross income into a
/// [`TaxCalculation`] under a given policy.
///
/// Tax calculators must be thread-safe (`Send + Sync`) because batch
/// comparisons invoke them concurrently.
pub trait TaxCalculator: Send + Sync {
    /// Short identifier, e.g. `"AU-RESIDENT"`.
    fn code(&self) -> &str;

    /// Income tax (excluding any levy) on `gross` income.
    fn income_tax(&self, gross: f64, policy: &Policy) -> f64;

    /// Medicare levy on `gross` income.
    fn medicare_levy(&self, gross: f64, policy: &Policy) -> f64;

    /// Full position for `gross`.  Non-finite or negative incomes are
    /// treated as zero.
    fn calculate(&self, gross: f64, policy: &Policy) -> TaxCalculation {
        let gross = non_negative(gross);
        let income_tax = self.income_tax(gross, policy);
        let medicare_levy = self.medicare_levy(gross, policy);
        TaxCalculation {
            gross_income: gross,
            income_tax,
            medicare_levy,
            net_take_home_pay: gross - income_tax - medicare_levy,
        }
    }
}

/// Resident individual: piecewise-linear brackets plus a flat levy once
/// income exceeds the low-income threshold.
pub struct ResidentTaxCalculator;

impl TaxCalculator for ResidentTaxCalculator {
    fn code(&self) -> &str {
        "AU-RESIDENT"
    }

    fn income_tax(&self, gross: f64, policy: &Policy) -> f64 {
        // Brackets are inclusive at their floor, so income exactly on a
        // threshold yields that bracket's base tax with no rounding drift.
        policy
            .brackets
            .iter()
            .rev()
            .find(|bracket| gross >= bracket.threshold)
            .map(|bracket| bracket.base_tax + (gross - bracket.threshold) * bracket.rate)
            .unwrap_or(0.0)
    }

    fn medicare_levy(&self, gross: f64, policy: &Policy) -> f64 {
        if gross > policy.medicare_levy_threshold {
            gross * policy.medicare_levy_rate
        } else {
            0.0
        }
    }
}

/// Tax position of an Australian resident earning `gross_income` a year.
pub fn compute_tax(gross_income: f64, policy: &Policy) -> TaxCalculation {
    ResidentTaxCalculator.calculate(gross_income, policy)
}
