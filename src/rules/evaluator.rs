//! Per-row rule evaluation

use super::RuleSet;
use crate::facts::FactRow;
use crate::types::{Finding, RiskLevel, Severity};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Evaluation outcome for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEvaluation {
    pub row: FactRow,
    /// Findings in rule-list order
    pub findings: Vec<Finding>,
    /// Sum of matched rules' basis-point hints
    pub hint_bps_sum: f64,
    /// Sum of matched rules' per-item fee hints
    pub hint_per_item_sum: BigDecimal,
    /// False iff any finding's severity rank reaches the cutoff
    pub is_compliant: bool,
}

impl RowEvaluation {
    /// Comma-joined ids of the matched rules (derived, for display)
    pub fn finding_ids(&self) -> String {
        self.findings
            .iter()
            .map(|f| f.rule_id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Pipe-joined messages of the matched rules (derived, for display)
    pub fn findings_text(&self) -> String {
        self.findings
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Display-level risk, worst severity with the MEDIUM escalation
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_findings(&self.findings)
    }
}

/// Evaluate every rule against every row
///
/// Rules run independently; a rule that cannot be evaluated for a row
/// is a non-match there and has no effect on sibling rows or rows. The
/// cutoff severity name is forgiving (unknown names mean MEDIUM).
pub fn evaluate_rules(
    rows: Vec<FactRow>,
    rules: &RuleSet,
    min_fail_severity: &str,
) -> Vec<RowEvaluation> {
    let cutoff = Severity::parse_or_default(min_fail_severity).rank();
    rows.into_iter()
        .map(|row| evaluate_row(row, rules, cutoff))
        .collect()
}

fn evaluate_row(row: FactRow, rules: &RuleSet, cutoff: u8) -> RowEvaluation {
    let mut findings = Vec::new();
    let mut hint_bps_sum = 0.0;
    let mut hint_per_item_sum = BigDecimal::from(0);

    for rule in rules.rules() {
        if rule.matches(&row) {
            hint_bps_sum += rule.definition.impact_hint_bps;
            hint_per_item_sum += &rule.definition.impact_hint_per_item;
            findings.push(rule.definition.finding());
        }
    }

    let is_compliant = !findings.iter().any(|f| f.severity.rank() >= cutoff);

    RowEvaluation {
        row,
        findings,
        hint_bps_sum,
        hint_per_item_sum,
        is_compliant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::facts::derive_facts;
    use crate::rules::RuleDefinition;
    use crate::types::{Channel, Region, Transaction};
    use std::str::FromStr;

    fn rule(id: &str, severity: Severity, when: &str, bps: f64, per_item: &str) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            title: format!("Rule {id}"),
            severity,
            when: when.to_string(),
            message: format!("{id} violated"),
            remediation: format!("fix {id}"),
            impact_hint_bps: bps,
            impact_hint_per_item: BigDecimal::from_str(per_item).unwrap(),
        }
    }

    fn eu_ecom_rows() -> Vec<FactRow> {
        let txn = Transaction {
            merchant_country: "FR".to_string(),
            merchant_region: Region::Eu,
            amount: BigDecimal::from(200),
            channel: Channel::Ecom,
            ..Transaction::default()
        };
        derive_facts(&[txn], &Thresholds::default())
    }

    #[test]
    fn test_findings_preserve_rule_order() {
        let rules = RuleSet::from_definitions(vec![
            rule("B-RULE", Severity::Low, "is_ecom", 10.0, "0"),
            rule("A-RULE", Severity::High, "sca_required and not sca_applied", 20.0, "0.05"),
        ]);
        let evals = evaluate_rules(eu_ecom_rows(), &rules, "MEDIUM");
        assert_eq!(evals[0].findings.len(), 2);
        assert_eq!(evals[0].finding_ids(), "B-RULE,A-RULE");
        assert_eq!(
            evals[0].findings_text(),
            "B-RULE violated | A-RULE violated"
        );
        assert_eq!(evals[0].hint_bps_sum, 30.0);
        assert_eq!(
            evals[0].hint_per_item_sum,
            BigDecimal::from_str("0.05").unwrap()
        );
    }

    #[test]
    fn test_compliance_cutoff() {
        let rules = RuleSet::from_definitions(vec![rule(
            "LOW-1",
            Severity::Low,
            "is_ecom",
            0.0,
            "0",
        )]);
        // LOW finding below a MEDIUM cutoff stays compliant
        let evals = evaluate_rules(eu_ecom_rows(), &rules, "MEDIUM");
        assert!(evals[0].is_compliant);
        assert_eq!(evals[0].findings.len(), 1);
        // at a LOW cutoff the same finding fails the row
        let evals = evaluate_rules(eu_ecom_rows(), &rules, "LOW");
        assert!(!evals[0].is_compliant);
        // an unknown cutoff name behaves like MEDIUM
        let evals = evaluate_rules(eu_ecom_rows(), &rules, "whatever");
        assert!(evals[0].is_compliant);
    }

    #[test]
    fn test_compliance_invariant_matches_findings() {
        let rules = RuleSet::from_definitions(vec![
            rule("L", Severity::Low, "is_ecom", 0.0, "0"),
            rule("H", Severity::High, "amount >= 100", 0.0, "0"),
        ]);
        for cutoff in ["LOW", "MEDIUM", "HIGH", "CRITICAL"] {
            let rank = Severity::parse_or_default(cutoff).rank();
            for eval in evaluate_rules(eu_ecom_rows(), &rules, cutoff) {
                let has_failure = eval.findings.iter().any(|f| f.severity.rank() >= rank);
                assert_eq!(eval.is_compliant, !has_failure);
            }
        }
    }

    #[test]
    fn test_unevaluable_rule_never_matches() {
        let rules = RuleSet::from_definitions(vec![
            rule("BROKEN", Severity::Critical, "amount ??? 3", 0.0, "0"),
            rule("MISSING", Severity::Critical, "no_such_field > 1", 0.0, "0"),
            // a misspelled field inside a disjunction poisons the whole
            // rule even though the other disjunct holds for this row
            rule("TYPO", Severity::Critical, "is_ecom or no_such_fieldd", 50.0, "1"),
            rule("OK", Severity::Low, "is_ecom", 0.0, "0"),
        ]);
        let evals = evaluate_rules(eu_ecom_rows(), &rules, "LOW");
        assert_eq!(evals[0].finding_ids(), "OK");
        // no impact hints leak from the non-matching rules either
        assert_eq!(evals[0].hint_bps_sum, 0.0);
        assert_eq!(evals[0].hint_per_item_sum, BigDecimal::from(0));
    }

    #[test]
    fn test_medium_escalation_in_risk_level() {
        let rules = RuleSet::from_definitions(vec![
            rule("M1", Severity::Medium, "is_ecom", 0.0, "0"),
            rule("M2", Severity::Medium, "amount > 1", 0.0, "0"),
            rule("M3", Severity::Medium, "merchant_region == 'EU'", 0.0, "0"),
        ]);
        let evals = evaluate_rules(eu_ecom_rows(), &rules, "MEDIUM");
        assert_eq!(evals[0].findings.len(), 3);
        assert_eq!(evals[0].risk_level(), RiskLevel::High);
    }

    #[test]
    fn test_empty_rule_set() {
        let evals = evaluate_rules(eu_ecom_rows(), &RuleSet::new(), "MEDIUM");
        assert!(evals[0].is_compliant);
        assert!(evals[0].findings.is_empty());
        assert_eq!(evals[0].risk_level(), RiskLevel::None);
        assert_eq!(evals[0].finding_ids(), "");
    }
}
