//! Server configuration, read from the environment.

use crate::policy::AU_2023_24;
use std::path::PathBuf;

pub const BIND_ADDR_VAR: &str = "VEHICLE_COST_BIND_ADDR";
pub const POLICY_DIR_VAR: &str = "VEHICLE_COST_POLICY_DIR";
pub const DEFAULT_POLICY_VAR: &str = "VEHICLE_COST_DEFAULT_POLICY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Directory of policy JSON files.  It need not exist.
    pub policy_dir: PathBuf,
    pub default_policy: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            policy_dir: PathBuf::from("policies"),
            default_policy: AU_2023_24.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            bind_addr: get(BIND_ADDR_VAR).unwrap_or(defaults.bind_addr),
            policy_dir: get(POLICY_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.policy_dir),
            default_policy: get(DEFAULT_POLICY_VAR).unwrap_or(defaults.default_policy),
        }
    }
}
