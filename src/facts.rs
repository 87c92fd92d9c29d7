//! Fact derivation: augmenting canonical rows with the derived
//! attributes the rules evaluate against
//!
//! Derivation is deterministic and side-effect-free, and every derived
//! fact is a stable fixed point: re-deriving from a fact row's embedded
//! transaction reproduces the identical result.

use crate::config::Thresholds;
use crate::rules::{FactSource, FactValue};
use crate::types::{Channel, EciStrength, Region, Transaction};
use bigdecimal::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Derived attributes for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFacts {
    pub is_pos: bool,
    pub is_ecom: bool,
    /// MOTO via either the mapper's indicator or a MOTO channel value
    pub is_moto: bool,
    /// Merchant sits in an EU/UK region
    pub is_eu_uk: bool,
    pub issuer_region: Region,
    pub issuer_known: bool,
    pub issuer_eu_uk: bool,
    pub eci_strength: EciStrength,
    /// Cross-border per the batch policy (country comparison when any
    /// issuer in the batch is known, the input flag otherwise)
    pub cross_border_calc: bool,
    pub is_commercial: bool,
    /// Threshold snapshot exposed to rule predicates
    pub cfg_pos_hours: f64,
    pub cfg_cnp_hours: f64,
}

/// A canonical transaction plus its derived facts
///
/// The embedded transaction carries the resolved `sca_required`; apart
/// from that it is the mapper's output untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub transaction: Transaction,
    pub facts: DerivedFacts,
}

/// Derive facts for a whole batch
///
/// The cross-border comparison method is a deliberate batch-level
/// policy, decided once per dataset: if any row has a known issuer
/// country, every row is judged by direct issuer-vs-merchant country
/// comparison; otherwise every row falls back to its input flag.
pub fn derive_facts(rows: &[Transaction], thresholds: &Thresholds) -> Vec<FactRow> {
    let any_issuer_known = rows.iter().any(|t| t.card_country.is_some());
    rows.iter()
        .map(|t| derive_row(t, thresholds, any_issuer_known))
        .collect()
}

fn derive_row(transaction: &Transaction, thresholds: &Thresholds, any_issuer_known: bool) -> FactRow {
    let mut transaction = transaction.clone();

    let is_pos = transaction.channel == Channel::Pos;
    let is_ecom = transaction.channel == Channel::Ecom;
    let is_moto = transaction.moto_indicator || transaction.channel == Channel::Moto;

    let is_eu_uk = transaction.merchant_region.is_eu_uk();

    let issuer_known = transaction.card_country.is_some();
    let issuer_region = transaction
        .card_country
        .as_deref()
        .map(Region::from_country)
        .unwrap_or(Region::Row);
    let issuer_eu_uk = issuer_region.is_eu_uk();

    let eci_strength = EciStrength::from_code(&transaction.eci);

    let cross_border_flag = transaction.cross_border;
    let cross_border_calc = if any_issuer_known {
        transaction.card_country.as_deref().unwrap_or("") != transaction.merchant_country
    } else {
        cross_border_flag
    };

    // One-leg-out aware issuer inference: with an unknown issuer, an
    // EU/UK merchant without an explicit cross-border flag is treated
    // as domestic.
    let issuer_eu_uk_inferred = !issuer_known && is_eu_uk && !cross_border_flag;
    let issuer_eu_uk_final = issuer_eu_uk || issuer_eu_uk_inferred;

    let low_value = transaction.amount < thresholds.defaults.low_value_threshold;
    let sca_required = transaction.sca_required.unwrap_or(
        is_eu_uk
            && issuer_eu_uk_final
            && is_ecom
            && !is_moto
            && !transaction.mit_indicator
            && !low_value,
    );
    transaction.sca_required = Some(sca_required);

    let is_commercial = transaction.product.to_lowercase().starts_with("commercial");

    FactRow {
        transaction,
        facts: DerivedFacts {
            is_pos,
            is_ecom,
            is_moto,
            is_eu_uk,
            issuer_region,
            issuer_known,
            issuer_eu_uk,
            eci_strength,
            cross_border_calc,
            is_commercial,
            cfg_pos_hours: thresholds.defaults.pos_clearing_hours,
            cfg_cnp_hours: thresholds.defaults.cnp_clearing_hours,
        },
    }
}

impl FactSource for FactRow {
    fn fact(&self, name: &str) -> Option<FactValue> {
        let t = &self.transaction;
        let f = &self.facts;
        let value = match name {
            "transaction_id" => FactValue::Text(t.transaction_id.clone()),
            "brand" => FactValue::Text(t.brand.clone()),
            "merchant_id" => FactValue::Text(t.merchant_id.clone()),
            "merchant_name" => FactValue::Text(t.merchant_name.clone()),
            "merchant_country" => FactValue::Text(t.merchant_country.clone()),
            "merchant_region" => FactValue::Text(t.merchant_region.to_string()),
            "card_country" => {
                FactValue::Text(t.card_country.clone().unwrap_or_default())
            }
            "amount" => FactValue::Number(t.amount.to_f64().unwrap_or(0.0)),
            "currency" => FactValue::Text(t.currency.clone()),
            "settlement_amount" => {
                FactValue::Number(t.settlement_amount.to_f64().unwrap_or(0.0))
            }
            "settlement_currency" => FactValue::Text(t.settlement_currency.clone()),
            "channel" => FactValue::Text(t.channel.to_string()),
            "pos_entry_mode" => FactValue::Text(t.pos_entry_mode.clone()),
            "avs_used" => FactValue::Bool(t.avs_used),
            "eci" => FactValue::Text(t.eci.clone()),
            "eci_strength" => FactValue::Text(f.eci_strength.to_string()),
            "sca_applied" => FactValue::Bool(t.sca_applied),
            "sca_required" => FactValue::Bool(t.sca_required.unwrap_or(false)),
            "product" => FactValue::Text(t.product.clone()),
            "enhanced_fields_present" => FactValue::Bool(t.enhanced_fields_present),
            "enhanced_validated" => FactValue::Bool(t.enhanced_validated),
            "settlement_delay_hours" => FactValue::Number(t.settlement_delay_hours),
            "moto_indicator" => FactValue::Bool(t.moto_indicator),
            "mit_indicator" => FactValue::Bool(t.mit_indicator),
            "mit_expected" => FactValue::Bool(t.mit_expected),
            "cross_border" => FactValue::Bool(t.cross_border),
            "is_pos" => FactValue::Bool(f.is_pos),
            "is_ecom" => FactValue::Bool(f.is_ecom),
            "is_moto" => FactValue::Bool(f.is_moto),
            "is_eu_uk" => FactValue::Bool(f.is_eu_uk),
            "issuer_region" => FactValue::Text(f.issuer_region.to_string()),
            "issuer_known" => FactValue::Bool(f.issuer_known),
            "issuer_eu_uk" => FactValue::Bool(f.issuer_eu_uk),
            "cross_border_calc" => FactValue::Bool(f.cross_border_calc),
            "is_commercial" => FactValue::Bool(f.is_commercial),
            "cfg_pos_hours" => FactValue::Number(f.cfg_pos_hours),
            "cfg_cnp_hours" => FactValue::Number(f.cfg_cnp_hours),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn eu_ecom_transaction(amount: i32) -> Transaction {
        Transaction {
            merchant_country: "FR".to_string(),
            merchant_region: Region::Eu,
            amount: BigDecimal::from(amount),
            channel: Channel::Ecom,
            ..Transaction::default()
        }
    }

    fn thresholds() -> Thresholds {
        Thresholds::default() // low-value 30, POS 24h, CNP 72h
    }

    #[test]
    fn test_sca_required_eu_ecom_unknown_issuer() {
        // EU merchant, unknown issuer, ECOM, no cross-border flag,
        // amount 50 vs low-value 30: issuer inferred EU, SCA required
        let rows = derive_facts(&[eu_ecom_transaction(50)], &thresholds());
        let row = &rows[0];
        assert!(!row.facts.issuer_known);
        assert_eq!(row.facts.issuer_region, Region::Row);
        assert!(row.facts.is_eu_uk);
        assert_eq!(row.transaction.sca_required, Some(true));
    }

    #[test]
    fn test_sca_low_value_exemption() {
        let rows = derive_facts(&[eu_ecom_transaction(10)], &thresholds());
        assert_eq!(rows[0].transaction.sca_required, Some(false));
    }

    #[test]
    fn test_low_value_boundary_is_strict() {
        // amount == threshold is not low-value, SCA still required
        let rows = derive_facts(&[eu_ecom_transaction(30)], &thresholds());
        assert_eq!(rows[0].transaction.sca_required, Some(true));
    }

    #[test]
    fn test_sca_not_required_cross_border_unknown_issuer() {
        let mut txn = eu_ecom_transaction(50);
        txn.cross_border = true;
        let rows = derive_facts(&[txn], &thresholds());
        assert_eq!(rows[0].transaction.sca_required, Some(false));
    }

    #[test]
    fn test_sca_exclusions() {
        let mut moto = eu_ecom_transaction(50);
        moto.moto_indicator = true;
        let mut mit = eu_ecom_transaction(50);
        mit.mit_indicator = true;
        let mut pos = eu_ecom_transaction(50);
        pos.channel = Channel::Pos;
        let rows = derive_facts(&[moto, mit, pos], &thresholds());
        for row in &rows {
            assert_eq!(row.transaction.sca_required, Some(false));
        }
    }

    #[test]
    fn test_mapper_supplied_sca_required_is_respected() {
        let mut txn = eu_ecom_transaction(50);
        txn.sca_required = Some(false);
        let rows = derive_facts(&[txn], &thresholds());
        assert_eq!(rows[0].transaction.sca_required, Some(false));
    }

    #[test]
    fn test_cross_border_batch_policy() {
        let mut known = eu_ecom_transaction(50);
        known.card_country = Some("US".to_string());
        let mut unknown = eu_ecom_transaction(50);
        unknown.cross_border = true;

        // With one known issuer in the batch, every row is judged by
        // country comparison; the unknown row compares as empty != FR.
        let rows = derive_facts(&[known.clone(), unknown.clone()], &thresholds());
        assert!(rows[0].facts.cross_border_calc);
        assert!(rows[1].facts.cross_border_calc);

        // With no known issuer anywhere, the input flag decides.
        let rows = derive_facts(&[unknown, eu_ecom_transaction(50)], &thresholds());
        assert!(rows[0].facts.cross_border_calc);
        assert!(!rows[1].facts.cross_border_calc);
    }

    #[test]
    fn test_domestic_known_issuer() {
        let mut txn = eu_ecom_transaction(50);
        txn.card_country = Some("FR".to_string());
        let rows = derive_facts(&[txn], &thresholds());
        assert!(rows[0].facts.issuer_known);
        assert_eq!(rows[0].facts.issuer_region, Region::Eu);
        assert!(!rows[0].facts.cross_border_calc);
        assert_eq!(rows[0].transaction.sca_required, Some(true));
    }

    #[test]
    fn test_commercial_classification() {
        let mut commercial = eu_ecom_transaction(50);
        commercial.product = "Commercial_Corporate".to_string();
        let mut consumer = eu_ecom_transaction(50);
        consumer.product = "consumer".to_string();
        let rows = derive_facts(&[commercial, consumer], &thresholds());
        assert!(rows[0].facts.is_commercial);
        assert!(!rows[1].facts.is_commercial);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let mut txn = eu_ecom_transaction(50);
        txn.eci = "05".to_string();
        txn.card_country = Some("DE".to_string());
        let first = derive_facts(&[txn], &thresholds());
        let second = derive_facts(&[first[0].transaction.clone()], &thresholds());
        assert_eq!(first, second);
    }

    #[test]
    fn test_fact_lookup() {
        let rows = derive_facts(&[eu_ecom_transaction(50)], &thresholds());
        let row = &rows[0];
        assert_eq!(row.fact("amount"), Some(FactValue::Number(50.0)));
        assert_eq!(
            row.fact("merchant_region"),
            Some(FactValue::Text("EU".to_string()))
        );
        assert_eq!(row.fact("is_ecom"), Some(FactValue::Bool(true)));
        assert_eq!(row.fact("cfg_cnp_hours"), Some(FactValue::Number(72.0)));
        assert_eq!(row.fact("card_country"), Some(FactValue::Text(String::new())));
        assert_eq!(row.fact("unknown_fact"), None);
    }

    #[test]
    fn test_moto_channel_sets_is_moto() {
        let mut txn = eu_ecom_transaction(50);
        txn.channel = Channel::Moto;
        let rows = derive_facts(&[txn], &thresholds());
        assert!(rows[0].facts.is_moto);
        assert!(!rows[0].facts.is_ecom);
    }
}
