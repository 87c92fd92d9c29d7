//! Declarative compliance rules: definitions, compiled rule sets, and
//! the per-row evaluator

pub mod evaluator;
pub mod predicate;

pub use evaluator::{evaluate_rules, RowEvaluation};
pub use predicate::{FactSource, FactValue, Predicate, PredicateError};

use crate::types::{ComplianceError, ComplianceResult, Finding, Severity};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One rule as authored in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    /// Boolean predicate text over fact/attribute names
    pub when: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub remediation: String,
    /// Estimated cost of the violation in basis points of the amount
    #[serde(default)]
    pub impact_hint_bps: f64,
    /// Estimated fixed cost of the violation per transaction
    #[serde(default)]
    pub impact_hint_per_item: BigDecimal,
}

impl RuleDefinition {
    /// Build the finding this rule produces when it matches a row
    pub fn finding(&self) -> Finding {
        Finding {
            rule_id: self.id.clone(),
            title: self.title.clone(),
            severity: self.severity,
            message: self.message.clone(),
            remediation: self.remediation.clone(),
            impact_hint_bps: self.impact_hint_bps,
            impact_hint_per_item: self.impact_hint_per_item.clone(),
        }
    }
}

/// A rule with its predicate parsed at load time
///
/// A rule whose predicate failed to parse is kept (so operators can see
/// it in diagnostics) but never matches any row.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub definition: RuleDefinition,
    predicate: Option<Predicate>,
    parse_error: Option<String>,
}

impl CompiledRule {
    fn compile(definition: RuleDefinition) -> Self {
        match Predicate::parse(&definition.when) {
            Ok(predicate) => Self {
                definition,
                predicate: Some(predicate),
                parse_error: None,
            },
            Err(err) => {
                log::warn!(
                    "rule '{}' has an unevaluable predicate ({err}); it will never match",
                    definition.id
                );
                Self {
                    definition,
                    predicate: None,
                    parse_error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn is_evaluable(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether this rule matches the row; unevaluable predicates and
    /// per-row evaluation failures are non-matches
    pub fn matches(&self, facts: &dyn FactSource) -> bool {
        self.predicate
            .as_ref()
            .and_then(|p| p.evaluate(facts))
            .unwrap_or(false)
    }
}

/// An ordered, load-time-compiled rule list
///
/// Order affects only findings-list ordering; rules evaluate
/// independently.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

/// JSON shape of a rule configuration file: `{"rules": [...]}`
#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleDefinition>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: Vec<RuleDefinition>) -> Self {
        Self {
            rules: definitions.into_iter().map(CompiledRule::compile).collect(),
        }
    }

    /// Parse a `{"rules": [...]}` document
    pub fn from_json_str(json: &str) -> ComplianceResult<Self> {
        let file: RuleFile = serde_json::from_str(json)?;
        Ok(Self::from_definitions(file.rules))
    }

    pub fn from_path(path: &Path) -> ComplianceResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Append another rule set, preserving order (common rules first,
    /// then per-scheme rules, matching how configs are layered)
    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn push(&mut self, definition: RuleDefinition) {
        self.rules.push(CompiledRule::compile(definition));
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose predicates failed to parse, with the reason
    pub fn unevaluable_rules(&self) -> Vec<(&str, &str)> {
        self.rules
            .iter()
            .filter_map(|r| {
                r.parse_error
                    .as_deref()
                    .map(|reason| (r.definition.id.as_str(), reason))
            })
            .collect()
    }

    /// Hard-fail on the first unevaluable predicate, for callers that
    /// prefer strict configuration validation over degraded evaluation
    pub fn validate(&self) -> ComplianceResult<()> {
        match self.unevaluable_rules().first() {
            None => Ok(()),
            Some((rule_id, reason)) => Err(ComplianceError::Predicate {
                rule_id: rule_id.to_string(),
                reason: reason.to_string(),
            }),
        }
    }
}
