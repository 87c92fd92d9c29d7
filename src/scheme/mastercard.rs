//! Mastercard clearing-export mapper

use super::{BinTable, RawRow, SchemeMapper};
use crate::types::{Channel, Region, Transaction};

const AVS_USED_CODES: [&str; 3] = ["Y", "Z", "A"];

/// Merchant category codes treated as commercial/corporate
const COMMERCIAL_MCC: [&str; 2] = ["5045", "7399"];

/// MOTO is keyed entry in Mastercard feeds
const MOTO_POS_ENTRY_MODE: &str = "81";

/// Maps Mastercard exports (`mc_`-prefixed columns plus the unprefixed
/// `channel_type` enrichment column) to the canonical schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct MastercardMapper;

impl SchemeMapper for MastercardMapper {
    fn scheme(&self) -> &'static str {
        "mastercard"
    }

    fn detect(&self, row: &RawRow) -> bool {
        row.has_column_prefix("mc_")
    }

    fn map_row(&self, row: &RawRow, bins: &BinTable) -> Transaction {
        let merchant_country = row.text("mc_merchant_country_code").to_uppercase();
        let merchant_region = Region::from_country(&merchant_country);

        let channel_text = row.text("channel_type").to_lowercase();
        let channel = if channel_text.contains("ecommerce") || channel_text.contains("ecom") {
            Channel::Ecom
        } else {
            Channel::Pos
        };

        let eci = {
            let raw = row.text("mc_eci_indicator").to_uppercase();
            if raw.is_empty() {
                "NA".to_string()
            } else {
                raw
            }
        };
        let sca_applied = channel == Channel::Ecom
            && (matches!(eci.as_str(), "05" | "06") || channel_text.contains("3ds"));

        let avs_used =
            AVS_USED_CODES.contains(&row.text("mc_avs_result_code").to_uppercase().as_str());

        let product = if COMMERCIAL_MCC.contains(&row.text("mc_merchant_category_code")) {
            "commercial_corporate".to_string()
        } else {
            "consumer".to_string()
        };

        let pos_entry_mode = row.text("mc_pos_entry_mode").to_string();

        Transaction {
            transaction_id: row.text("mc_retrieval_reference_number").to_string(),
            brand: "Mastercard".to_string(),
            merchant_id: row.text("mc_card_acceptor_id_code").to_string(),
            merchant_name: row.text("mc_card_acceptor_name_location").to_string(),
            merchant_country,
            merchant_region,
            card_country: bins
                .lookup(row.text("mc_issuer_bin"))
                .map(|cc| cc.to_string()),
            amount: row.amount("mc_transaction_amount"),
            currency: row.text("mc_transaction_currency_code").to_uppercase(),
            settlement_amount: row.amount("mc_settlement_amount"),
            settlement_currency: row.text("mc_settlement_currency_code").to_uppercase(),
            channel,
            moto_indicator: pos_entry_mode == MOTO_POS_ENTRY_MODE,
            pos_entry_mode,
            avs_used,
            eci,
            sca_applied,
            sca_required: None,
            product,
            enhanced_fields_present: false,
            enhanced_validated: false,
            // No authorization timestamp in the feed
            settlement_delay_hours: 0.0,
            mit_indicator: false,
            mit_expected: false,
            cross_border: row.flag("mc_cross_border_indicator"),
        }
    }
}
