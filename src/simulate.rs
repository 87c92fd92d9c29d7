//! What-if simulation over fact-augmented rows
//!
//! Toggles mutate a copy of the derived rows to model hypothetical
//! policy changes; the result is meant to be re-run through the rule
//! evaluator and impact estimator and compared against the as-is run.

use crate::facts::FactRow;
use serde::{Deserialize, Serialize};

/// Named policy toggles; unspecified toggles are no-ops and toggles
/// compose independently
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationToggles {
    /// Force SCA application on all EU/UK e-commerce rows
    #[serde(default)]
    pub apply_sca: bool,
    /// Force AVS usage on all e-commerce rows
    #[serde(default)]
    pub force_avs: bool,
    /// Mark enhanced data present and validated on commercial rows
    #[serde(default)]
    pub validate_enhanced: bool,
    /// Cap settlement delay at this many hours
    #[serde(default)]
    pub reduce_delay_to: Option<f64>,
}

/// Apply the toggles to a copy of the rows; the input is never mutated
pub fn apply_simulation(rows: &[FactRow], toggles: &SimulationToggles) -> Vec<FactRow> {
    rows.iter()
        .map(|row| {
            let mut sim = row.clone();
            if toggles.apply_sca && sim.facts.is_eu_uk && sim.facts.is_ecom {
                sim.transaction.sca_applied = true;
            }
            if toggles.force_avs && sim.facts.is_ecom {
                sim.transaction.avs_used = true;
            }
            if toggles.validate_enhanced && sim.facts.is_commercial {
                sim.transaction.enhanced_fields_present = true;
                sim.transaction.enhanced_validated = true;
            }
            if let Some(cap) = toggles.reduce_delay_to {
                if sim.transaction.settlement_delay_hours > cap {
                    sim.transaction.settlement_delay_hours = cap;
                }
            }
            sim
        })
        .collect()
}
