//! Pipeline orchestration: Mapper → Fact Deriver → Rule Evaluator →
//! Impact Estimator
//!
//! The orchestrator threads configuration through unchanged and returns
//! in-memory results; retries, persistence, and timeouts belong to the
//! caller. Configuration is read-only during a run, so one pipeline
//! value can serve concurrent runs over independent row sets.

use crate::config::{ComplianceConfig, Thresholds};
use crate::facts::{derive_facts, FactRow};
use crate::impact::{estimate_row_impact, ImpactEstimate};
use crate::rules::{evaluate_rules, RowEvaluation, RuleSet};
use crate::scheme::{resolve_mapper, BinTable, FormatDirective, RawRow};
use crate::simulate::{apply_simulation, SimulationToggles};
use crate::types::{Finding, RiskLevel};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Full per-transaction outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    pub evaluation: RowEvaluation,
    pub impact: ImpactEstimate,
}

impl RowResult {
    pub fn facts(&self) -> &FactRow {
        &self.evaluation.row
    }

    pub fn findings(&self) -> &[Finding] {
        &self.evaluation.findings
    }

    pub fn is_compliant(&self) -> bool {
        self.evaluation.is_compliant
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.evaluation.risk_level()
    }
}

/// Per-transaction detail reported for rows with at least one finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReport {
    pub id: String,
    pub risk_level: RiskLevel,
    pub findings: Vec<Finding>,
}

/// Aggregated outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Scheme name of the mapper that handled the batch
    pub format: String,
    /// True when auto-detection recognized no scheme and the rows
    /// passed through unmapped
    pub unmapped_format: bool,
    pub rows: usize,
    pub non_compliant: usize,
    /// `(rows - non_compliant) / rows`; 1.0 for an empty batch
    pub compliance_rate: f64,
    pub total_estimated_impact: BigDecimal,
    /// Match count per rule id across the batch
    pub rule_counts: BTreeMap<String, usize>,
    /// Detail for transactions with findings, in row order
    pub transactions: Vec<TransactionReport>,
}

/// Results plus summary for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub results: Vec<RowResult>,
    pub summary: RunSummary,
}

/// The compliance evaluation pipeline with its loaded configuration
#[derive(Debug, Clone, Default)]
pub struct CompliancePipeline {
    thresholds: Thresholds,
    rules: RuleSet,
    bin_table: BinTable,
}

impl CompliancePipeline {
    pub fn new(thresholds: Thresholds, rules: RuleSet, bin_table: BinTable) -> Self {
        Self {
            thresholds,
            rules,
            bin_table,
        }
    }

    pub fn from_config(config: ComplianceConfig) -> Self {
        Self::new(config.thresholds, config.rules, config.bin_table)
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run the full pipeline over a raw batch
    pub fn run(
        &self,
        rows: &[RawRow],
        directive: FormatDirective,
        min_fail_severity: &str,
    ) -> PipelineRun {
        let (mapper, unmapped_format) = resolve_mapper(directive, rows);
        let transactions = mapper.map_rows(rows, &self.bin_table);
        let fact_rows = derive_facts(&transactions, &self.thresholds);
        self.finish(fact_rows, mapper.scheme(), unmapped_format, min_fail_severity)
    }

    /// Re-run evaluation and estimation over hypothetically modified
    /// facts, for as-is vs what-if comparison
    pub fn what_if(
        &self,
        rows: &[FactRow],
        toggles: &SimulationToggles,
        min_fail_severity: &str,
    ) -> PipelineRun {
        let simulated = apply_simulation(rows, toggles);
        self.finish(simulated, "what-if", false, min_fail_severity)
    }

    fn finish(
        &self,
        fact_rows: Vec<FactRow>,
        format: &str,
        unmapped_format: bool,
        min_fail_severity: &str,
    ) -> PipelineRun {
        let evaluations = evaluate_rules(fact_rows, &self.rules, min_fail_severity);
        let results: Vec<RowResult> = evaluations
            .into_iter()
            .map(|evaluation| {
                let impact = estimate_row_impact(&evaluation);
                RowResult { evaluation, impact }
            })
            .collect();
        let summary = summarize(&results, format, unmapped_format);
        PipelineRun { results, summary }
    }
}

fn summarize(results: &[RowResult], format: &str, unmapped_format: bool) -> RunSummary {
    let rows = results.len();
    let non_compliant = results.iter().filter(|r| !r.is_compliant()).count();
    let compliance_rate = if rows == 0 {
        1.0
    } else {
        (rows - non_compliant) as f64 / rows as f64
    };

    let total_estimated_impact = results
        .iter()
        .fold(BigDecimal::from(0), |acc, r| acc + &r.impact.total);

    let mut rule_counts: BTreeMap<String, usize> = BTreeMap::new();
    for result in results {
        for finding in result.findings() {
            *rule_counts.entry(finding.rule_id.clone()).or_insert(0) += 1;
        }
    }

    let transactions = results
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.findings().is_empty())
        .map(|(index, r)| {
            let id = if r.facts().transaction.transaction_id.is_empty() {
                index.to_string()
            } else {
                r.facts().transaction.transaction_id.clone()
            };
            TransactionReport {
                id,
                risk_level: r.risk_level(),
                findings: r.findings().to_vec(),
            }
        })
        .collect();

    RunSummary {
        run_id: Uuid::new_v4(),
        format: format.to_string(),
        unmapped_format,
        rows,
        non_compliant,
        compliance_rate,
        total_estimated_impact,
        rule_counts,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleDefinition;
    use crate::types::Severity;
    use std::str::FromStr;

    fn sca_rule() -> RuleDefinition {
        RuleDefinition {
            id: "SCA-01".to_string(),
            title: "SCA required but not applied".to_string(),
            severity: Severity::High,
            when: "sca_required and not sca_applied".to_string(),
            message: "Missing strong customer authentication".to_string(),
            remediation: "Enable 3DS on the payment page".to_string(),
            impact_hint_bps: 20.0,
            impact_hint_per_item: BigDecimal::from_str("0.05").unwrap(),
        }
    }

    fn pipeline() -> CompliancePipeline {
        CompliancePipeline::new(
            Thresholds::default(),
            RuleSet::from_definitions(vec![sca_rule()]),
            BinTable::empty(),
        )
    }

    fn eu_ecom_raw(id: &str, amount: &str) -> RawRow {
        RawRow::from_pairs(&[
            ("transaction_id", id),
            ("merchant_country", "FR"),
            ("channel", "ECOM"),
            ("amount", amount),
        ])
    }

    #[test]
    fn test_end_to_end_raw_batch() {
        let rows = vec![eu_ecom_raw("T-1", "200"), eu_ecom_raw("T-2", "10")];
        let run = pipeline().run(&rows, FormatDirective::Raw, "MEDIUM");

        assert_eq!(run.summary.rows, 2);
        assert_eq!(run.summary.format, "raw");
        assert!(!run.summary.unmapped_format);
        // T-1 needs SCA and has none; T-2 is low-value
        assert_eq!(run.summary.non_compliant, 1);
        assert_eq!(run.summary.compliance_rate, 0.5);
        assert_eq!(run.summary.rule_counts.get("SCA-01"), Some(&1));
        // 200 * 20bps + 0.05 = 0.45
        assert_eq!(
            run.summary.total_estimated_impact,
            BigDecimal::from_str("0.45").unwrap()
        );

        assert_eq!(run.summary.transactions.len(), 1);
        let report = &run.summary.transactions[0];
        assert_eq!(report.id, "T-1");
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.findings[0].rule_id, "SCA-01");
    }

    #[test]
    fn test_empty_batch() {
        let run = pipeline().run(&[], FormatDirective::Auto, "MEDIUM");
        assert_eq!(run.summary.rows, 0);
        assert_eq!(run.summary.compliance_rate, 1.0);
        assert_eq!(run.summary.total_estimated_impact, BigDecimal::from(0));
        assert!(run.summary.transactions.is_empty());
    }

    #[test]
    fn test_unmapped_format_is_flagged_not_failed() {
        let rows = vec![RawRow::from_pairs(&[("some_unknown_col", "x")])];
        let run = pipeline().run(&rows, FormatDirective::Auto, "MEDIUM");
        assert!(run.summary.unmapped_format);
        assert_eq!(run.summary.format, "raw");
        assert_eq!(run.summary.rows, 1);
        // degraded facts only, no SCA finding on a ROW-region default row
        assert!(run.results[0].is_compliant());
    }

    #[test]
    fn test_what_if_resolves_violation() {
        let rows = vec![eu_ecom_raw("T-1", "200")];
        let pipe = pipeline();
        let as_is = pipe.run(&rows, FormatDirective::Raw, "MEDIUM");
        assert_eq!(as_is.summary.non_compliant, 1);

        let fact_rows: Vec<FactRow> = as_is
            .results
            .iter()
            .map(|r| r.facts().clone())
            .collect();
        let toggles = SimulationToggles {
            apply_sca: true,
            ..SimulationToggles::default()
        };
        let what_if = pipe.what_if(&fact_rows, &toggles, "MEDIUM");
        assert_eq!(what_if.summary.format, "what-if");
        assert_eq!(what_if.summary.non_compliant, 0);
        assert_eq!(
            what_if.summary.total_estimated_impact,
            BigDecimal::from(0)
        );
        // original run untouched
        assert_eq!(as_is.summary.non_compliant, 1);
    }

    #[test]
    fn test_missing_transaction_id_falls_back_to_row_index() {
        let rows = vec![RawRow::from_pairs(&[
            ("merchant_country", "FR"),
            ("channel", "ECOM"),
            ("amount", "200"),
        ])];
        let run = pipeline().run(&rows, FormatDirective::Raw, "MEDIUM");
        assert_eq!(run.summary.transactions[0].id, "0");
    }
}
