//! Visa clearing-export mapper

use super::{BinTable, RawRow, SchemeMapper};
use crate::types::{Channel, Region, Transaction};
use chrono::{NaiveDate, NaiveDateTime};

/// AVS result codes that count as "address verification used":
/// full match, zip-only match, address-only match
const AVS_USED_CODES: [&str; 3] = ["Y", "Z", "A"];

/// Product codes marking commercial/corporate card products
const COMMERCIAL_PRODUCT_CODES: [&str; 5] = ["B", "C", "G", "J", "K"];

/// Maps Visa clearing-like exports (`visa_`-prefixed columns) to the
/// canonical schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisaMapper;

impl SchemeMapper for VisaMapper {
    fn scheme(&self) -> &'static str {
        "visa"
    }

    fn detect(&self, row: &RawRow) -> bool {
        row.has_column_prefix("visa_")
    }

    fn map_row(&self, row: &RawRow, bins: &BinTable) -> Transaction {
        let merchant_country = row.text("visa_merchant_country_code").to_uppercase();
        let merchant_region = Region::from_country(&merchant_country);

        let channel_text = row.text("visa_channel_type").to_lowercase();
        let channel = if channel_text.contains("ecom") {
            Channel::Ecom
        } else {
            Channel::Pos
        };

        let eci = normalize_eci(row.first_text(&["visa_eci_indicator", "visa_eci_3ds_auth"]));
        let sca_applied = channel == Channel::Ecom
            && (matches!(eci.as_str(), "05" | "06") || channel_text.contains("3ds"));

        let avs_used = AVS_USED_CODES
            .contains(&row.text("visa_avs_result_code").to_uppercase().as_str());

        let product = if COMMERCIAL_PRODUCT_CODES
            .contains(&row.text("visa_product_code").to_uppercase().as_str())
        {
            "commercial_corporate".to_string()
        } else {
            "consumer".to_string()
        };

        // BIN lookup first, feed-supplied issuer country as fallback
        let card_country = bins
            .lookup(row.text("visa_issuer_bin"))
            .map(|cc| cc.to_string())
            .or_else(|| {
                let fallback = row.text("issuer_country");
                if fallback.is_empty() {
                    None
                } else {
                    Some(fallback.to_uppercase())
                }
            });

        let transaction_id = row
            .first_text(&["visa_arn", "visa_retrieval_reference_number"])
            .unwrap_or("")
            .to_string();

        Transaction {
            transaction_id,
            brand: "Visa".to_string(),
            merchant_id: row.text("visa_card_acceptor_id_code").to_string(),
            merchant_name: row.text("merchant_name").to_string(),
            merchant_country,
            merchant_region,
            card_country,
            amount: row.amount("visa_transaction_amount"),
            currency: row.text("visa_transaction_currency_code").to_string(),
            settlement_amount: row.amount("visa_settlement_amount"),
            settlement_currency: row.text("visa_settlement_currency_code").to_uppercase(),
            channel,
            pos_entry_mode: row.text("visa_pos_entry_mode").to_string(),
            avs_used,
            eci,
            sca_applied,
            sca_required: None,
            product,
            enhanced_fields_present: false,
            enhanced_validated: false,
            settlement_delay_hours: settlement_delay_hours(
                row.text("visa_presentment_date"),
                row.text("visa_auth_date"),
            ),
            moto_indicator: channel_text.contains("moto"),
            mit_indicator: false,
            mit_expected: false,
            cross_border: row.flag("visa_cross_border_indicator"),
        }
    }
}

/// Normalize the ECI indicator: uppercase, left-pad single digits to
/// two, collapse "00" to "0". Absent indicator is "NA".
fn normalize_eci(value: Option<&str>) -> String {
    let raw = match value {
        Some(raw) => raw.trim().to_uppercase(),
        None => return "NA".to_string(),
    };
    let padded = if raw.len() < 2 {
        format!("{raw:0>2}")
    } else {
        raw
    };
    if padded == "00" {
        "0".to_string()
    } else {
        padded
    }
}

/// Presentment minus authorization, in hours; 0 when either timestamp
/// is absent or unparseable
fn settlement_delay_hours(presentment: &str, auth: &str) -> f64 {
    match (parse_timestamp(presentment), parse_timestamp(auth)) {
        (Some(pres), Some(auth)) => (pres - auth).num_seconds() as f64 / 3600.0,
        _ => 0.0,
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn full_row() -> RawRow {
        RawRow::from_pairs(&[
            ("visa_merchant_country_code", "fr"),
            ("visa_transaction_amount", "125.40"),
            ("visa_transaction_currency_code", "EUR"),
            ("visa_channel_type", "ecommerce_3ds"),
            ("visa_pos_entry_mode", "81"),
            ("visa_avs_result_code", "Z"),
            ("visa_eci_indicator", "5"),
            ("visa_product_code", "C"),
            ("visa_cross_border_indicator", "TRUE"),
            ("visa_issuer_bin", "4123456789"),
            ("visa_presentment_date", "2024-03-03 10:00:00"),
            ("visa_auth_date", "2024-03-01 10:00:00"),
            ("visa_arn", "ARN-001"),
            ("visa_card_acceptor_id_code", "M-42"),
            ("merchant_name", "Cafe Lumiere"),
        ])
    }

    fn bins() -> BinTable {
        let mut entries = HashMap::new();
        entries.insert("412345".to_string(), "DE".to_string());
        BinTable::from_map(entries)
    }

    #[test]
    fn test_full_visa_row() {
        let txn = VisaMapper.map_row(&full_row(), &bins());
        assert_eq!(txn.brand, "Visa");
        assert_eq!(txn.merchant_country, "FR");
        assert_eq!(txn.merchant_region, Region::Eu);
        assert_eq!(txn.amount, BigDecimal::from_str("125.40").unwrap());
        assert_eq!(txn.channel, Channel::Ecom);
        assert!(txn.avs_used);
        assert_eq!(txn.eci, "05");
        assert!(txn.sca_applied);
        assert_eq!(txn.sca_required, None);
        assert_eq!(txn.product, "commercial_corporate");
        assert_eq!(txn.card_country.as_deref(), Some("DE"));
        assert_eq!(txn.settlement_delay_hours, 48.0);
        assert!(txn.cross_border);
        assert_eq!(txn.transaction_id, "ARN-001");
        assert_eq!(txn.merchant_id, "M-42");
    }

    #[test]
    fn test_missing_columns_default() {
        let txn = VisaMapper.map_row(&RawRow::new(), &BinTable::empty());
        assert_eq!(txn.amount, BigDecimal::from(0));
        assert_eq!(txn.channel, Channel::Pos);
        assert_eq!(txn.eci, "NA");
        assert!(!txn.avs_used);
        assert!(!txn.sca_applied);
        assert_eq!(txn.product, "consumer");
        assert_eq!(txn.card_country, None);
        assert_eq!(txn.settlement_delay_hours, 0.0);
        assert_eq!(txn.transaction_id, "");
    }

    #[test]
    fn test_eci_normalization() {
        assert_eq!(normalize_eci(Some("5")), "05");
        assert_eq!(normalize_eci(Some("06")), "06");
        assert_eq!(normalize_eci(Some("00")), "0");
        assert_eq!(normalize_eci(Some("ecom_5")), "ECOM_5");
        assert_eq!(normalize_eci(None), "NA");
    }

    #[test]
    fn test_issuer_country_feed_fallback() {
        let mut row = full_row();
        row.insert("visa_issuer_bin", "999999000000");
        row.insert("issuer_country", "it");
        let txn = VisaMapper.map_row(&row, &bins());
        assert_eq!(txn.card_country.as_deref(), Some("IT"));
    }

    #[test]
    fn test_eci_fallback_column() {
        let row = RawRow::from_pairs(&[
            ("visa_channel_type", "ecommerce"),
            ("visa_eci_3ds_auth", "6"),
        ]);
        let txn = VisaMapper.map_row(&row, &BinTable::empty());
        assert_eq!(txn.eci, "06");
        // attempt-level ECI still counts as SCA applied
        assert!(txn.sca_applied);
        assert!(!txn.moto_indicator);
    }

    #[test]
    fn test_3ds_channel_text_counts_as_sca_applied() {
        // substring match, so "non3ds" channel labels count too
        let row = RawRow::from_pairs(&[("visa_channel_type", "ecommerce_non3ds")]);
        let txn = VisaMapper.map_row(&row, &BinTable::empty());
        assert!(txn.sca_applied);
    }

    #[test]
    fn test_moto_channel_text() {
        let row = RawRow::from_pairs(&[("visa_channel_type", "moto_keyed")]);
        let txn = VisaMapper.map_row(&row, &BinTable::empty());
        assert_eq!(txn.channel, Channel::Pos);
        assert!(txn.moto_indicator);
    }
}
