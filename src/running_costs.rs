//! Lifetime running costs and resale estimate.
//!
//! Costs are projected flat in nominal dollars: an annual figure times
//! the ownership horizon, with no inflation or compounding.

use crate::models::{CostBreakdown, UserInputs};
use crate::policy::Policy;
use crate::safe_math::{non_negative, safe_divide};

/// Fuel or energy spend over the whole horizon.
pub fn lifetime_fuel_cost(inputs: &UserInputs, policy: &Policy) -> f64 {
    let years = inputs.years();
    if let Some(spend) = inputs.fuel_spend {
        return spend.annual() * years;
    }
    if inputs.fuel_type.is_electric() {
        return policy.ev_cost_per_km * inputs.km_per_year * years;
    }
    let consumption = inputs
        .fuel_consumption_per_100km
        .unwrap_or_else(|| policy.fuel_consumption(inputs.fuel_type));
    (consumption / 100.0) * inputs.km_per_year * inputs.fuel_price * years
}

/// Number of full tyre sets bought over the horizon.  Zero distance
/// means zero sets.
pub fn tyre_sets(inputs: &UserInputs, policy: &Policy) -> f64 {
    let total_km = inputs.km_per_year * inputs.years();
    safe_divide(total_km, policy.tyre_set_interval_km).ceil()
}

/// Running costs and depreciation shared by every acquisition method.
/// The financing fields are left unset.
pub fn compute_running_costs(inputs: &UserInputs, policy: &Policy) -> CostBreakdown {
    let inputs = inputs.sanitized();
    let years = inputs.years();
    let price = inputs.drive_away_price;

    let depreciation = price * policy.depreciation_rate(inputs.ownership_years);

    CostBreakdown {
        vehicle_cost: price,
        depreciation,
        resale_value: non_negative(price - depreciation),
        fuel: non_negative(lifetime_fuel_cost(&inputs, policy)),
        insurance: inputs.insurance_annual * years,
        servicing: inputs.servicing_annual * years,
        tyres: inputs.tyres_annual * tyre_sets(&inputs, policy),
        rego_ctp: inputs.rego_ctp_annual * years,
        ..CostBreakdown::default()
    }
}
