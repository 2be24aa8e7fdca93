//! Versioned policy tables.
//!
//! Everything that changes when Australian tax law changes lives here:
//! income tax brackets, the Medicare levy, GST and FBT rates, the EV
//! exemption, ATO residual values and the depreciation curve.  The
//! formulas in the calculator modules read these tables and never
//! hard-code a rate, so a new financial year is a new [`Policy`] (or a
//! new JSON file under `policies/`) rather than a code change.

use crate::error::{EngineError, EngineResult};
use crate::models::FuelType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

pub const AU_2023_24: &str = "AU-2023-24";
pub const AU_2024_25: &str = "AU-2024-25";

/// One marginal income tax bracket.  `base_tax` is the cumulative tax
/// payable on income exactly at `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub threshold: f64,
    pub rate: f64,
    pub base_tax: f64,
}

impl TaxBracket {
    pub const fn new(threshold: f64, rate: f64, base_tax: f64) -> Self {
        Self {
            threshold,
            rate,
            base_tax,
        }
    }
}

/// Which taxes count towards the salary-packaging tax saving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxSavingBasis {
    IncomeTaxOnly,
    #[default]
    IncomeTaxAndLevy,
}

/// Default liquid-fuel consumption in L/100 km when the caller does not
/// supply one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelConsumption {
    pub combustion: f64,
    pub hybrid: f64,
}

/// A complete set of policy constants for one jurisdiction-year.
///
/// Missing keys in a JSON policy file fall back to the `AU-2023-24`
/// values, so a file only needs to list what changed.  The id and
/// description are never inherited: a file without an id fails
/// validation rather than standing in for the default policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub brackets: Vec<TaxBracket>,
    pub medicare_levy_rate: f64,
    /// Income at or below this pays no levy.  No phase-in is modelled.
    pub medicare_levy_threshold: f64,
    pub gst_rate: f64,
    pub fbt_statutory_rate: f64,
    /// Multiplier on the statutory value when work use exceeds 50%.
    pub operating_cost_reduction: f64,
    pub ev_fbt_exempt: bool,
    /// Government guideline running cost for electric vehicles, $/km.
    pub ev_cost_per_km: f64,
    pub tyre_set_interval_km: f64,
    pub depreciation_rates: BTreeMap<u32, f64>,
    pub depreciation_fallback: f64,
    pub residual_rates: BTreeMap<u32, f64>,
    pub residual_fallback: f64,
    /// Registration bundled into a drive-away price.  Jurisdiction
    /// average; real figures vary by state.
    pub onroad_rego_estimate: f64,
    /// Stamp duty as a share of the GST-inclusive vehicle value.
    /// Jurisdiction average; real figures vary by state.
    pub stamp_duty_rate: f64,
    /// GST-exclusive annual fee charged by the lease administrator.
    pub novated_admin_fee_annual: f64,
    pub default_fuel_consumption: FuelConsumption,
    pub tax_saving_basis: TaxSavingBasis,
}

impl Default for Policy {
    fn default() -> Self {
        Self::au_2023_24()
    }
}

impl Policy {
    /// 2023-24 resident rates.  The engine's default policy.
    pub fn au_2023_24() -> Self {
        Self {
            id: AU_2023_24.to_string(),
            description: "Australian resident rates 2023-24".to_string(),
            brackets: vec![
                TaxBracket::new(0.0, 0.0, 0.0),
                TaxBracket::new(18_200.0, 0.19, 0.0),
                TaxBracket::new(45_000.0, 0.325, 5_092.0),
                TaxBracket::new(120_000.0, 0.37, 29_467.0),
                TaxBracket::new(180_000.0, 0.45, 51_667.0),
            ],
            medicare_levy_rate: 0.02,
            medicare_levy_threshold: 23_365.0,
            gst_rate: 0.10,
            fbt_statutory_rate: 0.20,
            operating_cost_reduction: 0.5,
            ev_fbt_exempt: true,
            ev_cost_per_km: 0.042,
            tyre_set_interval_km: 45_000.0,
            depreciation_rates: BTreeMap::from([
                (1, 0.20),
                (2, 0.35),
                (3, 0.45),
                (4, 0.52),
                (5, 0.58),
            ]),
            depreciation_fallback: 0.58,
            residual_rates: BTreeMap::from([
                (1, 0.6556),
                (2, 0.5631),
                (3, 0.4700),
                (4, 0.3769),
                (5, 0.2838),
            ]),
            residual_fallback: 0.2838,
            onroad_rego_estimate: 900.0,
            stamp_duty_rate: 0.033,
            novated_admin_fee_annual: 0.0,
            default_fuel_consumption: FuelConsumption {
                combustion: 7.0,
                hybrid: 4.5,
            },
            tax_saving_basis: TaxSavingBasis::IncomeTaxAndLevy,
        }
    }

    /// 2024-25 resident rates after the stage 3 changes.
    pub fn au_2024_25() -> Self {
        Self {
            id: AU_2024_25.to_string(),
            description: "Australian resident rates 2024-25".to_string(),
            brackets: vec![
                TaxBracket::new(0.0, 0.0, 0.0),
                TaxBracket::new(18_200.0, 0.16, 0.0),
                TaxBracket::new(45_000.0, 0.30, 4_288.0),
                TaxBracket::new(135_000.0, 0.37, 31_288.0),
                TaxBracket::new(190_000.0, 0.45, 51_638.0),
            ],
            medicare_levy_threshold: 27_222.0,
            ..Self::au_2023_24()
        }
    }

    pub fn builtins() -> Vec<Policy> {
        vec![Self::au_2023_24(), Self::au_2024_25()]
    }

    /// Share of the drive-away price lost over `years`.  Horizons outside
    /// the table use the fallback (the 5-year rate by default).
    pub fn depreciation_rate(&self, years: u32) -> f64 {
        self.depreciation_rates
            .get(&years)
            .copied()
            .unwrap_or(self.depreciation_fallback)
    }

    /// ATO minimum residual as a share of the financed amount.
    pub fn residual_rate(&self, years: u32) -> f64 {
        self.residual_rates
            .get(&years)
            .copied()
            .unwrap_or(self.residual_fallback)
    }

    /// Whether an employee contribution is needed to cover FBT.
    pub fn fbt_applies(&self, fuel_type: FuelType) -> bool {
        !(fuel_type.is_electric() && self.ev_fbt_exempt)
    }

    pub fn fuel_consumption(&self, fuel_type: FuelType) -> f64 {
        match fuel_type {
            FuelType::PlugInHybrid => self.default_fuel_consumption.hybrid,
            _ => self.default_fuel_consumption.combustion,
        }
    }

    /// Checks the tables are usable by the calculators.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |reason: String| EngineError::InvalidPolicy {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("policy id is empty".into()));
        }
        if self.brackets.is_empty() {
            return Err(invalid("no tax brackets".into()));
        }
        for pair in self.brackets.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if upper.threshold <= lower.threshold {
                return Err(invalid(format!(
                    "bracket thresholds not ascending at {}",
                    upper.threshold
                )));
            }
            let implied = lower.base_tax + (upper.threshold - lower.threshold) * lower.rate;
            if (implied - upper.base_tax).abs() > 1.0 {
                return Err(invalid(format!(
                    "base tax {} at {} disagrees with {} implied by lower brackets",
                    upper.base_tax, upper.threshold, implied
                )));
            }
        }
        let rates = self
            .brackets
            .iter()
            .map(|b| ("bracket rate", b.rate))
            .chain(self.depreciation_rates.values().map(|r| ("depreciation rate", *r)))
            .chain(self.residual_rates.values().map(|r| ("residual rate", *r)))
            .chain([
                ("depreciation fallback", self.depreciation_fallback),
                ("residual fallback", self.residual_fallback),
                ("medicare levy rate", self.medicare_levy_rate),
                ("gst rate", self.gst_rate),
                ("fbt statutory rate", self.fbt_statutory_rate),
                ("operating cost reduction", self.operating_cost_reduction),
                ("stamp duty rate", self.stamp_duty_rate),
            ]);
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(format!("{name} {rate} outside 0..=1")));
            }
        }
        if !(self.tyre_set_interval_km.is_finite() && self.tyre_set_interval_km > 0.0) {
            return Err(invalid(format!(
                "tyre set interval {} must be positive",
                self.tyre_set_interval_km
            )));
        }
        let amounts = [
            ("ev cost per km", self.ev_cost_per_km),
            ("on-road registration estimate", self.onroad_rego_estimate),
            ("novated admin fee", self.novated_admin_fee_annual),
            ("medicare levy threshold", self.medicare_levy_threshold),
            ("combustion fuel consumption", self.default_fuel_consumption.combustion),
            ("hybrid fuel consumption", self.default_fuel_consumption.hybrid),
        ];
        for (name, amount) in amounts {
            if !(amount.is_finite() && amount >= 0.0) {
                return Err(invalid(format!("{name} {amount} is negative")));
            }
        }
        Ok(())
    }
}

/// Load all policy definitions from a directory.
///
/// Every `.json` file is parsed as a [`Policy`] and validated.  Files that
/// fail either step are skipped with a warning; only I/O errors on the
/// directory itself are returned.  A missing directory yields no
/// policies.
pub fn load_policies_from_dir(path: &Path) -> EngineResult<Vec<Policy>> {
    let io_err = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut policies = Vec::new();
    if !path.is_dir() {
        return Ok(policies);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file = entry.path();
        if file.is_file() && file.extension().is_some_and(|ext| ext == "json") {
            files.push(file);
        }
    }
    files.sort();
    for file in files {
        match read_policy(&file) {
            Ok(policy) => policies.push(policy),
            Err(err) => warn!(error = %err, "skipping policy file"),
        }
    }
    Ok(policies)
}

fn read_policy(file: &Path) -> EngineResult<Policy> {
    let data = std::fs::read_to_string(file).map_err(|source| EngineError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let policy: Policy = serde_json::from_str(&data).map_err(|source| EngineError::Parse {
        path: file.to_path_buf(),
        source,
    })?;
    policy.validate()?;
    Ok(policy)
}

/// The set of policies a server can calculate against, keyed by id.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
    default_id: String,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PolicyRegistry {
    pub fn with_builtins() -> Self {
        let policies = Policy::builtins()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self {
            policies,
            default_id: AU_2023_24.to_string(),
        }
    }

    /// Built-ins plus every valid policy in `dir`.  A file whose id
    /// matches a built-in replaces it.
    pub fn load(dir: &Path) -> EngineResult<Self> {
        let mut registry = Self::with_builtins();
        for policy in load_policies_from_dir(dir)? {
            info!(policy = %policy.id, "loaded policy");
            registry.insert(policy);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, policy: Policy) {
        self.policies.insert(policy.id.clone(), policy);
    }

    pub fn set_default(&mut self, id: &str) -> EngineResult<()> {
        if !self.policies.contains_key(id) {
            return Err(EngineError::UnknownPolicy(id.to_string()));
        }
        self.default_id = id.to_string();
        Ok(())
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn get(&self, id: &str) -> EngineResult<&Policy> {
        self.policies
            .get(id)
            .ok_or_else(|| EngineError::UnknownPolicy(id.to_string()))
    }

    /// Looks up `id`, or the default policy when none is requested.
    pub fn resolve(&self, id: Option<&str>) -> EngineResult<&Policy> {
        self.get(id.unwrap_or(&self.default_id))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.policies.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn builtins_validate() {
        for policy in Policy::builtins() {
            policy.validate().unwrap();
        }
    }

    #[test]
    fn horizons_outside_table_use_fallback() {
        let policy = Policy::default();
        assert_eq!(policy.depreciation_rate(3), 0.45);
        assert_eq!(policy.depreciation_rate(7), 0.58);
        assert_eq!(policy.depreciation_rate(0), 0.58);
        assert_eq!(policy.residual_rate(1), 0.6556);
        assert_eq!(policy.residual_rate(9), 0.2838);
    }

    #[test]
    fn ev_exemption_is_configurable() {
        let mut policy = Policy::default();
        assert!(!policy.fbt_applies(FuelType::Electric));
        assert!(policy.fbt_applies(FuelType::Combustion));
        policy.ev_fbt_exempt = false;
        assert!(policy.fbt_applies(FuelType::Electric));
    }

    #[test]
    fn rejects_inconsistent_base_tax() {
        let mut policy = Policy::default();
        policy.brackets[2].base_tax = 6_000.0;
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidPolicy { .. }));
    }

    #[test]
    fn rejects_unsorted_brackets() {
        let mut policy = Policy::default();
        policy.brackets.swap(1, 2);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn partial_json_inherits_defaults() {
        let policy: Policy =
            serde_json::from_str(r#"{"id": "AU-TEST", "ev_fbt_exempt": false}"#).unwrap();
        assert_eq!(policy.id, "AU-TEST");
        assert!(!policy.ev_fbt_exempt);
        assert_eq!(policy.gst_rate, 0.10);
        assert_eq!(policy.residual_rate(3), 0.47);
    }

    #[test]
    fn loads_valid_files_and_skips_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("custom.json"),
            r#"{"id": "AU-CUSTOM", "stamp_duty_rate": 0.04}"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("invalid.json"), r#"{"id": "AU-BAD", "gst_rate": 3.0}"#)
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let policies = load_policies_from_dir(dir.path()).unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].id, "AU-CUSTOM");
        assert_eq!(policies[0].stamp_duty_rate, 0.04);
    }

    #[test]
    fn rejects_negative_amounts_and_tyre_interval() {
        let mut policy = Policy::default();
        policy.tyre_set_interval_km = -45_000.0;
        assert!(policy.validate().is_err());
        policy.tyre_set_interval_km = 0.0;
        assert!(policy.validate().is_err());

        let mutations: [fn(&mut Policy); 5] = [
            |p| p.ev_cost_per_km = -0.01,
            |p| p.onroad_rego_estimate = -900.0,
            |p| p.novated_admin_fee_annual = -1.0,
            |p| p.medicare_levy_threshold = -1.0,
            |p| p.default_fuel_consumption.hybrid = f64::NAN,
        ];
        for mutate in mutations {
            let mut policy = Policy::default();
            mutate(&mut policy);
            assert!(matches!(
                policy.validate(),
                Err(EngineError::InvalidPolicy { .. })
            ));
        }
    }

    #[test]
    fn negative_tyre_interval_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tyres.json"),
            r#"{"id": "AU-TYRES", "tyre_set_interval_km": -45000}"#,
        )
        .unwrap();
        assert!(load_policies_from_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn file_without_id_cannot_replace_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("draft.json"),
            r#"{"description": "draft", "stamp_duty_rate": 0.9}"#,
        )
        .unwrap();
        let registry = PolicyRegistry::load(dir.path()).unwrap();
        let default = registry.resolve(None).unwrap();
        assert_eq!(default.id, AU_2023_24);
        assert_eq!(default.stamp_duty_rate, 0.033);
        assert_eq!(registry.ids().len(), 2);

        let parsed: Policy = serde_json::from_str(r#"{"gst_rate": 0.1}"#).unwrap();
        assert!(parsed.id.is_empty());
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn missing_directory_is_empty() {
        let policies = load_policies_from_dir(Path::new("/definitely/not/here")).unwrap();
        assert!(policies.is_empty());
    }

    #[test]
    fn registry_resolves_default_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("override.json"),
            r#"{"id": "AU-2023-24", "novated_admin_fee_annual": 250.0}"#,
        )
        .unwrap();
        let mut registry = PolicyRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.resolve(None).unwrap().novated_admin_fee_annual, 250.0);
        assert_eq!(registry.ids(), vec![AU_2023_24.to_string(), AU_2024_25.to_string()]);

        registry.set_default(AU_2024_25).unwrap();
        assert_eq!(registry.resolve(None).unwrap().id, AU_2024_25);
        assert!(matches!(
            registry.get("NZ-2024"),
            Err(EngineError::UnknownPolicy(_))
        ));
        assert!(registry.set_default("NZ-2024").is_err());
    }
}
