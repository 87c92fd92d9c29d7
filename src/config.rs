//! Threshold configuration and bundled pipeline configuration loading
//!
//! Configuration is loaded once before a run and treated as read-only
//! for the run's duration; it is safe to share across concurrent runs.

use crate::rules::RuleSet;
use crate::scheme::BinTable;
use crate::types::{ComplianceError, ComplianceResult};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Threshold values referenced by the fact deriver and by rule predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDefaults {
    /// Clearing-time limit for card-present transactions, in hours
    #[serde(default = "default_pos_clearing_hours")]
    pub pos_clearing_hours: f64,
    /// Clearing-time limit for card-not-present transactions, in hours
    #[serde(default = "default_cnp_clearing_hours")]
    pub cnp_clearing_hours: f64,
    /// Amount below which the SCA low-value exemption applies (strict `<`)
    #[serde(default = "default_low_value_threshold")]
    pub low_value_threshold: BigDecimal,
}

fn default_pos_clearing_hours() -> f64 {
    24.0
}

fn default_cnp_clearing_hours() -> f64 {
    72.0
}

fn default_low_value_threshold() -> BigDecimal {
    BigDecimal::from(30)
}

impl Default for ThresholdDefaults {
    fn default() -> Self {
        Self {
            pos_clearing_hours: default_pos_clearing_hours(),
            cnp_clearing_hours: default_cnp_clearing_hours(),
            low_value_threshold: default_low_value_threshold(),
        }
    }
}

/// Threshold configuration document: `{"defaults": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub defaults: ThresholdDefaults,
}

impl Thresholds {
    pub fn from_json_str(json: &str) -> ComplianceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load thresholds; a missing file yields the documented defaults
    pub fn from_path(path: &Path) -> ComplianceResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "threshold file {} not found; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Everything a pipeline run needs, loaded from one configuration
/// directory laid out as:
///
/// ```text
/// config/
///   thresholds.json          (optional; defaults apply)
///   rules_common.json
///   schemes/visa.json        (optional)
///   schemes/mastercard.json  (optional)
///   bin_table.json           (optional; issuer country degrades to unknown)
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComplianceConfig {
    pub thresholds: Thresholds,
    pub rules: RuleSet,
    pub bin_table: BinTable,
}

impl ComplianceConfig {
    pub fn new(thresholds: Thresholds, rules: RuleSet, bin_table: BinTable) -> Self {
        Self {
            thresholds,
            rules,
            bin_table,
        }
    }

    /// Load a configuration directory
    ///
    /// Rule files are layered in a fixed order: common rules first, then
    /// per-scheme rules. Missing optional files degrade with a warning;
    /// a missing directory is an error, not an empty configuration.
    pub fn load_dir(dir: &Path) -> ComplianceResult<Self> {
        if !dir.is_dir() {
            return Err(ComplianceError::Config(format!(
                "configuration directory {} does not exist",
                dir.display()
            )));
        }

        let thresholds = Thresholds::from_path(&dir.join("thresholds.json"))?;

        let mut rules = RuleSet::new();
        for relative in [
            "rules_common.json",
            "schemes/visa.json",
            "schemes/mastercard.json",
        ] {
            let path = dir.join(relative);
            if path.exists() {
                rules.extend(RuleSet::from_path(&path)?);
            } else {
                log::warn!("rule file {} not found; skipping", path.display());
            }
        }

        let bin_table = BinTable::from_path(&dir.join("bin_table.json"));

        Ok(Self::new(thresholds, rules, bin_table))
    }
}
