//! Period conversion and currency formatting shared by the calculators
//! and whatever renders their results.

use crate::models::{DisplayPeriod, PayFrequency};
use crate::safe_math::{safe_divide, safe_number};

/// Converts an annual amount to the given display period.
pub fn to_display_period(annual_amount: f64, period: DisplayPeriod) -> f64 {
    safe_divide(annual_amount, period.periods_per_year())
}

/// Suffix shown after a periodic amount, e.g. `"/week"`.
pub fn display_period_label(period: DisplayPeriod) -> &'static str {
    match period {
        DisplayPeriod::Weekly => "/week",
        DisplayPeriod::Fortnightly => "/fortnight",
        DisplayPeriod::Monthly => "/month",
        DisplayPeriod::Annually => "/year",
    }
}

/// An annual amount expressed per pay cycle.
pub fn pay_cycle_amount(annual_amount: f64, frequency: PayFrequency) -> f64 {
    safe_divide(annual_amount, frequency.periods_per_year())
}

/// A lifetime total spread evenly over every pay cycle in the horizon.
pub fn cost_per_pay_cycle(total: f64, years: u32, frequency: PayFrequency) -> f64 {
    safe_divide(total, f64::from(years) * frequency.periods_per_year())
}

/// Whole-number rendering with `en-AU` thousands separators.
pub fn format_number(value: f64) -> String {
    let rounded = safe_number(value).round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Whole-dollar currency, e.g. `$45,000` or `-$1,250`.
pub fn format_currency(value: f64) -> String {
    let number = format_number(value);
    match number.strip_prefix('-') {
        Some(magnitude) => format!("-${magnitude}"),
        None => format!("${number}"),
    }
}
