//! Data models for the Vehicle Cost Engine.
//!
//! The `models` module defines the serialisable input snapshot
//! ([`UserInputs`]) and the value objects produced for each acquisition
//! method ([`CostBreakdown`], [`TaxCalculation`], [`ComparisonResult`]).
//! All of them derive `Serialize` and `Deserialize` using camelCase field
//! names so they can be exchanged with a browser front end unchanged.
//! None of them carry identity; a fresh set is built on every
//! recalculation and discarded once rendered.

use crate::safe_math::non_negative;
use serde::{Deserialize, Serialize};

/// Propulsion category of the vehicle being costed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    /// Petrol or diesel internal combustion.
    #[default]
    #[serde(rename = "combustion", alias = "petrol_diesel", alias = "petrol", alias = "diesel")]
    Combustion,
    /// Plug-in hybrid.  Costed on liquid fuel like a combustion vehicle.
    #[serde(rename = "hybrid", alias = "plug-in-hybrid", alias = "phev")]
    PlugInHybrid,
    /// Battery electric.
    #[serde(rename = "ev", alias = "electric")]
    Electric,
}

impl FuelType {
    pub fn is_electric(self) -> bool {
        matches!(self, FuelType::Electric)
    }
}

/// How often the employee is paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayFrequency {
    Weekly,
    #[default]
    Fortnightly,
    Monthly,
}

impl PayFrequency {
    /// Number of pay cycles in a year (52/26/12).
    pub fn periods_per_year(self) -> f64 {
        match self {
            PayFrequency::Weekly => 52.0,
            PayFrequency::Fortnightly => 26.0,
            PayFrequency::Monthly => 12.0,
        }
    }
}

/// Period used when presenting an annual amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPeriod {
    Weekly,
    Fortnightly,
    Monthly,
    #[default]
    #[serde(alias = "annual", alias = "yearly")]
    Annually,
}

impl DisplayPeriod {
    pub fn periods_per_year(self) -> f64 {
        match self {
            DisplayPeriod::Weekly => 52.0,
            DisplayPeriod::Fortnightly => 26.0,
            DisplayPeriod::Monthly => 12.0,
            DisplayPeriod::Annually => 1.0,
        }
    }
}

/// The three acquisition methods under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMethod {
    Outright,
    Finance,
    Novated,
}

/// Which methods the caller wants compared.  Missing flags default to
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledMethods {
    pub outright: bool,
    pub finance: bool,
    pub novated: bool,
}

impl Default for EnabledMethods {
    fn default() -> Self {
        Self {
            outright: true,
            finance: true,
            novated: true,
        }
    }
}

impl EnabledMethods {
    pub fn none() -> Self {
        Self {
            outright: false,
            finance: false,
            novated: false,
        }
    }

    pub fn only(method: ComparisonMethod) -> Self {
        let mut enabled = Self::none();
        match method {
            ComparisonMethod::Outright => enabled.outright = true,
            ComparisonMethod::Finance => enabled.finance = true,
            ComparisonMethod::Novated => enabled.novated = true,
        }
        enabled
    }
}

/// A fuel budget entered as "amount per period" instead of being
/// estimated from distance and consumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelSpend {
    #[serde(default, deserialize_with = "lenient::number")]
    pub amount: f64,
    #[serde(default)]
    pub period: DisplayPeriod,
}

impl FuelSpend {
    pub fn annual(&self) -> f64 {
        non_negative(self.amount) * self.period.periods_per_year()
    }
}

/// Immutable snapshot of every assumption behind one calculation pass.
///
/// Every numeric field deserialises leniently: numbers, numeric strings,
/// `null` and missing fields are all accepted, with anything unusable
/// becoming `0`.  Call [`UserInputs::sanitized`] before computing; the
/// public calculators do so themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputs {
    #[serde(default)]
    pub fuel_type: FuelType,
    #[serde(default, deserialize_with = "lenient::number")]
    pub drive_away_price: f64,
    /// Ownership horizon in whole years.
    #[serde(default = "one_year", deserialize_with = "lenient::years")]
    pub ownership_years: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub km_per_year: f64,
    /// Price per litre of fuel.  Ignored for electric vehicles, which are
    /// costed on the policy's per-km rate.
    #[serde(default, deserialize_with = "lenient::number")]
    pub fuel_price: f64,
    /// Overrides the policy's default consumption for the fuel type.
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub fuel_consumption_per_100km: Option<f64>,
    /// Overrides the distance-based fuel estimate entirely.
    #[serde(default)]
    pub fuel_spend: Option<FuelSpend>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub insurance_annual: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub servicing_annual: f64,
    /// Price of one full set of tyres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub tyres_annual: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rego_ctp_annual: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub annual_salary: f64,
    #[serde(default)]
    pub pay_frequency: PayFrequency,
    /// Annual loan interest rate in percent.
    #[serde(default, deserialize_with = "lenient::number")]
    pub finance_interest_rate: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub finance_deposit: f64,
    /// Annual novated lease interest rate in percent.
    #[serde(default, deserialize_with = "lenient::number")]
    pub novated_interest_rate: f64,
    #[serde(default, rename = "workUseOver50")]
    pub work_use_over_50: bool,
    #[serde(default)]
    pub comparison_methods: EnabledMethods,
    #[serde(default)]
    pub display_period: DisplayPeriod,
}

fn one_year() -> u32 {
    1
}

impl Default for UserInputs {
    /// The calculator's opening assumptions.
    fn default() -> Self {
        Self {
            fuel_type: FuelType::Combustion,
            drive_away_price: 45_000.0,
            ownership_years: 3,
            km_per_year: 15_000.0,
            fuel_price: 1.85,
            fuel_consumption_per_100km: None,
            fuel_spend: None,
            insurance_annual: 1_200.0,
            servicing_annual: 550.0,
            tyres_annual: 800.0,
            rego_ctp_annual: 900.0,
            annual_salary: 100_000.0,
            pay_frequency: PayFrequency::Fortnightly,
            finance_interest_rate: 8.5,
            finance_deposit: 0.0,
            novated_interest_rate: 9.0,
            work_use_over_50: false,
            comparison_methods: EnabledMethods::default(),
            display_period: DisplayPeriod::Annually,
        }
    }
}

impl UserInputs {
    /// Starts from the default assumptions with a preset vehicle applied.
    pub fn for_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            fuel_type: vehicle.fuel_type,
            drive_away_price: vehicle.drive_away_price,
            fuel_consumption_per_100km: Some(vehicle.fuel_consumption),
            servicing_annual: vehicle.average_servicing,
            ..Self::default()
        }
    }

    /// Returns a copy with every amount finite and non-negative and the
    /// ownership horizon at least one year.
    ///
    /// The deposit is deliberately not clamped to the price: the loan
    /// calculator copes with a non-positive principal.
    pub fn sanitized(&self) -> Self {
        Self {
            fuel_type: self.fuel_type,
            drive_away_price: non_negative(self.drive_away_price),
            ownership_years: self.ownership_years.max(1),
            km_per_year: non_negative(self.km_per_year),
            fuel_price: non_negative(self.fuel_price),
            fuel_consumption_per_100km: self
                .fuel_consumption_per_100km
                .filter(|c| c.is_finite())
                .map(non_negative),
            fuel_spend: self.fuel_spend.map(|spend| FuelSpend {
                amount: non_negative(spend.amount),
                period: spend.period,
            }),
            insurance_annual: non_negative(self.insurance_annual),
            servicing_annual: non_negative(self.servicing_annual),
            tyres_annual: non_negative(self.tyres_annual),
            rego_ctp_annual: non_negative(self.rego_ctp_annual),
            annual_salary: non_negative(self.annual_salary),
            pay_frequency: self.pay_frequency,
            finance_interest_rate: non_negative(self.finance_interest_rate),
            finance_deposit: non_negative(self.finance_deposit),
            novated_interest_rate: non_negative(self.novated_interest_rate),
            work_use_over_50: self.work_use_over_50,
            comparison_methods: self.comparison_methods,
            display_period: self.display_period,
        }
    }

    pub fn years(&self) -> f64 {
        f64::from(self.ownership_years)
    }
}

/// Lifetime cost components for one acquisition method.
///
/// The running-cost fields are filled by the running-cost estimator and
/// copied into every method; the optional fields are set only by the
/// method they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub vehicle_cost: f64,
    pub depreciation: f64,
    pub resale_value: f64,
    pub fuel: f64,
    pub insurance: f64,
    pub servicing: f64,
    pub tyres: f64,
    pub rego_ctp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<f64>,
    /// Employee contribution (ECM) total, which replaces an FBT payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balloon_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_savings_vehicle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_savings_running: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_tax_deduction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tax_deduction: Option<f64>,
}

impl CostBreakdown {
    /// Fuel, insurance, servicing, tyres and registration over the term.
    pub fn running_total(&self) -> f64 {
        self.fuel + self.insurance + self.servicing + self.tyres + self.rego_ctp
    }

    /// The running costs that carry GST (everything but rego/CTP).
    pub fn gst_bearing_total(&self) -> f64 {
        self.fuel + self.insurance + self.servicing + self.tyres
    }
}

/// Annual income tax position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCalculation {
    pub gross_income: f64,
    pub income_tax: f64,
    pub medicare_levy: f64,
    pub net_take_home_pay: f64,
}

/// How a salary-packaged lease changes the employee's pay cycle.
/// Per-period amounts use the input's pay frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeHomePayImpact {
    pub before: f64,
    pub after: f64,
    pub reduction: f64,
    /// Income tax saved over the whole term.
    pub tax_savings: f64,
    pub pre_tax_deduction: f64,
    pub post_tax_deduction: f64,
}

/// Top-level output for one acquisition method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub method: ComparisonMethod,
    pub total_lifetime_cost: f64,
    pub cost_per_year: f64,
    pub cost_per_pay_cycle: f64,
    pub breakdown: CostBreakdown,
    pub key_insight: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_home_pay: Option<TakeHomePayImpact>,
}

impl ComparisonResult {
    /// Annual cost expressed in the requested display period.
    pub fn cost_for_display(&self, period: DisplayPeriod) -> f64 {
        crate::format::to_display_period(self.cost_per_year, period)
    }

    /// What one pay cycle costs the employee: the take-home reduction
    /// for a salary-packaged method, otherwise the plain cost per cycle.
    pub fn pay_cycle_impact(&self) -> f64 {
        self.take_home_pay
            .map(|impact| impact.reduction)
            .unwrap_or(self.cost_per_pay_cycle)
    }
}

/// A preset vehicle from the sample catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub fuel_type: FuelType,
    pub drive_away_price: f64,
    /// L/100 km for liquid fuel, kWh/100 km for electric.
    pub fuel_consumption: f64,
    pub average_servicing: f64,
}

impl Vehicle {
    fn preset(
        id: &str,
        name: &str,
        fuel_type: FuelType,
        drive_away_price: f64,
        fuel_consumption: f64,
        average_servicing: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            fuel_type,
            drive_away_price,
            fuel_consumption,
            average_servicing,
        }
    }

    /// The sample catalogue offered by the vehicle picker.
    pub fn samples() -> Vec<Vehicle> {
        use FuelType::*;
        vec![
            Self::preset(
                "corolla-petrol",
                "Toyota Corolla Ascent (Petrol)",
                Combustion,
                32_990.0,
                6.5,
                450.0,
            ),
            Self::preset(
                "mazda3-petrol",
                "Mazda 3 G20 Pure (Petrol)",
                Combustion,
                35_990.0,
                6.2,
                480.0,
            ),
            Self::preset(
                "hilux-diesel",
                "Toyota HiLux SR (Diesel)",
                Combustion,
                55_490.0,
                7.8,
                650.0,
            ),
            Self::preset(
                "ranger-diesel",
                "Ford Ranger XL (Diesel)",
                Combustion,
                52_990.0,
                7.6,
                680.0,
            ),
            Self::preset(
                "corolla-hybrid",
                "Toyota Corolla Hybrid (Hybrid)",
                PlugInHybrid,
                36_990.0,
                4.2,
                400.0,
            ),
            Self::preset(
                "camry-hybrid",
                "Toyota Camry Hybrid (Hybrid)",
                PlugInHybrid,
                45_990.0,
                4.5,
                450.0,
            ),
            Self::preset("model3-ev", "Tesla Model 3 (EV)", Electric, 59_900.0, 14.0, 250.0),
            Self::preset("byd-seal-ev", "BYD Seal Premium (EV)", Electric, 65_990.0, 15.2, 280.0),
            Self::preset("mg4-ev", "MG4 Excite (EV)", Electric, 41_990.0, 16.5, 220.0),
        ]
    }
}

/// Forgiving deserialisers for numbers arriving from form fields.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn coerce(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }

    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce(&value).unwrap_or(0.0))
    }

    pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce(&value))
    }

    pub fn years<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let years = coerce(&value).unwrap_or(1.0).trunc();
        // `as` saturates, so oversized horizons land on u32::MAX.
        Ok(if years < 1.0 { 1 } else { years as u32 })
    }
}
