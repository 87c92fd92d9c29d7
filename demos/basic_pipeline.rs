//! Basic compliance pipeline example

use bigdecimal::BigDecimal;
use compliance_core::{
    BinTable, CompliancePipeline, FormatDirective, RawRow, RuleSet, SimulationToggles, Thresholds,
};
use std::collections::HashMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("💳 Compliance Core - Basic Pipeline Example\n");

    // 1. Load the rule set (normally read from a config directory)
    println!("📋 Loading rules...");
    let rules = RuleSet::from_json_str(
        r#"{
            "rules": [
                {
                    "id": "SCA-01",
                    "title": "SCA required but not applied",
                    "severity": "HIGH",
                    "when": "sca_required and not sca_applied",
                    "message": "Missing strong customer authentication",
                    "remediation": "Enable 3DS on the payment flow",
                    "impact_hint_bps": 20.0,
                    "impact_hint_per_item": "0.05"
                },
                {
                    "id": "CLR-CNP-01",
                    "title": "Late clearing for card-not-present",
                    "severity": "MEDIUM",
                    "when": "not is_pos and settlement_delay_hours > cfg_cnp_hours",
                    "message": "Cleared outside the CNP window",
                    "remediation": "Submit clearing within the CNP window",
                    "impact_hint_bps": 10.0
                }
            ]
        }"#,
    )?;
    for rule in rules.rules() {
        println!("  ✓ {} - {}", rule.definition.id, rule.definition.title);
    }
    println!();

    // 2. Build the pipeline with default thresholds and a small BIN table
    let mut bins = HashMap::new();
    bins.insert("412345".to_string(), "DE".to_string());
    let pipeline = CompliancePipeline::new(
        Thresholds::default(),
        rules,
        BinTable::from_map(bins),
    );

    // 3. Run it over a small Visa clearing batch
    println!("🔍 Evaluating a Visa batch...\n");
    let rows = vec![
        RawRow::from_pairs(&[
            ("visa_arn", "ARN-001"),
            ("visa_merchant_country_code", "FR"),
            ("visa_channel_type", "ecommerce"),
            ("visa_transaction_amount", "100"),
            ("visa_transaction_currency_code", "EUR"),
            ("visa_issuer_bin", "412345789012"),
            ("visa_auth_date", "2024-03-01 10:00:00"),
            ("visa_presentment_date", "2024-03-05 10:00:00"),
        ]),
        RawRow::from_pairs(&[
            ("visa_arn", "ARN-002"),
            ("visa_merchant_country_code", "FR"),
            ("visa_channel_type", "ecommerce_3ds"),
            ("visa_eci_indicator", "5"),
            ("visa_transaction_amount", "20"),
            ("visa_transaction_currency_code", "EUR"),
            ("visa_issuer_bin", "412345789012"),
        ]),
    ];

    let run = pipeline.run(&rows, FormatDirective::Auto, "MEDIUM");
    println!("  Format:          {}", run.summary.format);
    println!("  Rows:            {}", run.summary.rows);
    println!("  Non-compliant:   {}", run.summary.non_compliant);
    println!("  Compliance rate: {:.1}%", run.summary.compliance_rate * 100.0);
    println!("  Estimated cost:  {} EUR", run.summary.total_estimated_impact);
    println!();

    for report in &run.summary.transactions {
        println!("  ⚠ {} (risk: {:?})", report.id, report.risk_level);
        for finding in &report.findings {
            println!("    [{:?}] {}: {}", finding.severity, finding.rule_id, finding.message);
            println!("      ↳ {}", finding.remediation);
        }
    }
    println!();

    // 4. What-if: apply SCA everywhere and clear within a day
    println!("🔮 What-if: 3DS rollout plus next-day clearing...\n");
    let fact_rows: Vec<_> = run.results.iter().map(|r| r.facts().clone()).collect();
    let toggles = SimulationToggles {
        apply_sca: true,
        reduce_delay_to: Some(24.0),
        ..SimulationToggles::default()
    };
    let what_if = pipeline.what_if(&fact_rows, &toggles, "MEDIUM");

    println!("  Non-compliant:   {}", what_if.summary.non_compliant);
    println!("  Estimated cost:  {} EUR", what_if.summary.total_estimated_impact);
    let saved = &run.summary.total_estimated_impact - &what_if.summary.total_estimated_impact;
    if saved > BigDecimal::from(0) {
        println!("  💰 Estimated savings: {} EUR", saved);
    }

    println!("\n✅ Done");
    Ok(())
}
