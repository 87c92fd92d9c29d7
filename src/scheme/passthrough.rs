//! Best-effort mapper for already-canonical or unrecognized input
//!
//! Reads canonical column names directly; anything missing defaults to
//! a type-appropriate zero/empty value so the fact deriver always has a
//! complete row to work with.

use super::{BinTable, RawRow, SchemeMapper};
use crate::types::{Channel, Region, Transaction};

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMapper;

impl SchemeMapper for PassthroughMapper {
    fn scheme(&self) -> &'static str {
        "raw"
    }

    fn detect(&self, _row: &RawRow) -> bool {
        // Never auto-selected; format resolution falls back to it explicitly
        false
    }

    fn map_row(&self, row: &RawRow, bins: &BinTable) -> Transaction {
        let merchant_country = row.text("merchant_country").to_uppercase();
        let merchant_region = Region::from_country(&merchant_country);

        // Prefer an explicit issuer country column, then the BIN table
        let card_country = {
            let explicit = row.text("card_country");
            if !explicit.is_empty() {
                Some(explicit.to_uppercase())
            } else {
                bins.lookup(row.text("issuer_bin")).map(|cc| cc.to_string())
            }
        };

        let transaction_id = row
            .first_text(&["transaction_id", "id"])
            .unwrap_or("")
            .to_string();

        Transaction {
            transaction_id,
            brand: row.text("brand").to_string(),
            merchant_id: row.text("merchant_id").to_string(),
            merchant_name: row.text("merchant_name").to_string(),
            merchant_country,
            merchant_region,
            card_country,
            amount: row.amount("amount"),
            currency: row.text("currency").to_uppercase(),
            settlement_amount: row.amount("settlement_amount"),
            settlement_currency: row.text("settlement_currency").to_uppercase(),
            channel: Channel::from_canonical(row.text("channel")),
            pos_entry_mode: row.text("pos_entry_mode").to_string(),
            avs_used: row.flag("avs_used"),
            eci: {
                let eci = row.text("eci").to_uppercase();
                if eci.is_empty() {
                    "NA".to_string()
                } else {
                    eci
                }
            },
            sca_applied: row.flag("sca_applied"),
            // Respect a supplied value; leave unresolved otherwise
            sca_required: if row.has_column("sca_required") {
                Some(row.flag("sca_required"))
            } else {
                None
            },
            product: row.text("product").to_string(),
            enhanced_fields_present: row.flag("enhanced_fields_present"),
            enhanced_validated: row.flag("enhanced_validated"),
            settlement_delay_hours: row.number("settlement_delay_hours"),
            moto_indicator: row.flag("moto_indicator"),
            mit_indicator: row.flag("mit_indicator"),
            mit_expected: row.flag("mit_expected"),
            cross_border: row.flag("cross_border"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[test]
    fn test_canonical_columns_pass_through() {
        let row = RawRow::from_pairs(&[
            ("transaction_id", "T-1"),
            ("merchant_country", "gb"),
            ("card_country", "fr"),
            ("amount", "42.00"),
            ("currency", "gbp"),
            ("channel", "ECOM"),
            ("avs_used", "y"),
            ("eci", "05"),
            ("sca_applied", "true"),
            ("sca_required", "false"),
            ("product", "commercial_fleet"),
            ("settlement_delay_hours", "12.5"),
            ("cross_border", "1"),
        ]);
        let txn = PassthroughMapper.map_row(&row, &BinTable::empty());
        assert_eq!(txn.transaction_id, "T-1");
        assert_eq!(txn.merchant_region, Region::Uk);
        assert_eq!(txn.card_country.as_deref(), Some("FR"));
        assert_eq!(txn.amount, BigDecimal::from_str("42.00").unwrap());
        assert_eq!(txn.channel, Channel::Ecom);
        assert!(txn.avs_used);
        assert!(txn.sca_applied);
        assert_eq!(txn.sca_required, Some(false));
        assert_eq!(txn.product, "commercial_fleet");
        assert_eq!(txn.settlement_delay_hours, 12.5);
        assert!(txn.cross_border);
    }

    #[test]
    fn test_empty_row_defaults() {
        let txn = PassthroughMapper.map_row(&RawRow::new(), &BinTable::empty());
        assert_eq!(txn.transaction_id, "");
        assert_eq!(txn.merchant_region, Region::Row);
        assert_eq!(txn.card_country, None);
        assert_eq!(txn.amount, BigDecimal::from(0));
        assert_eq!(txn.channel, Channel::Pos);
        assert_eq!(txn.eci, "NA");
        assert_eq!(txn.sca_required, None);
        assert!(!txn.cross_border);
    }

    #[test]
    fn test_moto_channel_value() {
        let row = RawRow::from_pairs(&[("channel", "moto")]);
        let txn = PassthroughMapper.map_row(&row, &BinTable::empty());
        assert_eq!(txn.channel, Channel::Moto);
    }
}
