//! # Compliance Core
//!
//! A card-scheme compliance library providing scheme export
//! normalization, fact derivation, declarative rule evaluation, and
//! monetary impact estimation.
//!
//! ## Features
//!
//! - **Scheme normalization**: Visa and Mastercard clearing exports
//!   mapped onto one canonical transaction model, with format
//!   auto-detection and a pass-through for already-canonical data
//! - **Fact derivation**: channel, region, SCA-requirement, and
//!   cross-border facts computed per transaction
//! - **Declarative rules**: severity-ranked rules with predicate
//!   expressions compiled at load and evaluated per row
//! - **Impact estimation**: basis-point and per-item fee exposure from
//!   matched rules
//! - **What-if simulation**: policy toggles re-run against the same
//!   rule set for as-is vs hypothetical comparison
//!
//! ## Quick Start
//!
//! ```rust
//! use compliance_core::{
//!     BinTable, CompliancePipeline, FormatDirective, RawRow, RuleSet, Thresholds,
//! };
//!
//! let rules = RuleSet::from_json_str(
//!     r#"{"rules": [{
//!         "id": "SCA-01",
//!         "title": "SCA required but not applied",
//!         "severity": "HIGH",
//!         "when": "sca_required and not sca_applied"
//!     }]}"#,
//! )
//! .unwrap();
//!
//! let pipeline = CompliancePipeline::new(Thresholds::default(), rules, BinTable::empty());
//! let rows = vec![RawRow::from_pairs(&[
//!     ("transaction_id", "T-1"),
//!     ("merchant_country", "FR"),
//!     ("channel", "ECOM"),
//!     ("amount", "120.00"),
//! ])];
//!
//! let run = pipeline.run(&rows, FormatDirective::Auto, "MEDIUM");
//! assert_eq!(run.summary.non_compliant, 1);
//! ```

pub mod config;
pub mod facts;
pub mod impact;
pub mod pipeline;
pub mod rules;
pub mod scheme;
pub mod simulate;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::{ComplianceConfig, ThresholdDefaults, Thresholds};
pub use facts::{derive_facts, DerivedFacts, FactRow};
pub use impact::{estimate_impact, ImpactEstimate};
pub use pipeline::{CompliancePipeline, PipelineRun, RowResult, RunSummary, TransactionReport};
pub use rules::{evaluate_rules, CompiledRule, RowEvaluation, RuleDefinition, RuleSet};
pub use scheme::{
    resolve_mapper, BinTable, FormatDirective, MastercardMapper, PassthroughMapper, RawRow,
    SchemeMapper, VisaMapper,
};
pub use simulate::{apply_simulation, SimulationToggles};
pub use types::{
    Channel, ComplianceError, ComplianceResult, EciStrength, Finding, Region, RiskLevel, Severity,
    Transaction,
};
