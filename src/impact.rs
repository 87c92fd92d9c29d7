//! Monetary impact estimation from matched rules' hints

use crate::rules::RowEvaluation;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Estimated monetary impact of one transaction's findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    /// Amount-proportional component: `amount * bps_sum / 10000`
    pub bps_amount: BigDecimal,
    /// Fixed component: the summed per-item fee hints
    pub per_item_amount: BigDecimal,
    pub total: BigDecimal,
}

/// Estimate the monetary impact from the summed rule hints
///
/// Pure arithmetic: `amount * (bps_sum / 10000) + per_item_sum`. The
/// amount is sanitized upstream, so there is no failure mode here; a
/// non-finite bps sum degrades to zero.
pub fn estimate_impact(
    amount: &BigDecimal,
    hint_bps_sum: f64,
    hint_per_item_sum: &BigDecimal,
) -> ImpactEstimate {
    let bps = BigDecimal::try_from(hint_bps_sum).unwrap_or_else(|_| BigDecimal::from(0));
    let bps_amount = amount * bps / BigDecimal::from(10_000);
    let total = &bps_amount + hint_per_item_sum;
    ImpactEstimate {
        bps_amount,
        per_item_amount: hint_per_item_sum.clone(),
        total,
    }
}

/// Convenience form working directly off an evaluation
pub fn estimate_row_impact(evaluation: &RowEvaluation) -> ImpactEstimate {
    estimate_impact(
        &evaluation.row.transaction.amount,
        evaluation.hint_bps_sum,
        &evaluation.hint_per_item_sum,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_impact_formula() {
        // 200 * (50 / 10000) + 0.15 = 1.15
        let estimate = estimate_impact(
            &BigDecimal::from(200),
            50.0,
            &BigDecimal::from_str("0.15").unwrap(),
        );
        assert_eq!(estimate.bps_amount, BigDecimal::from(1));
        assert_eq!(estimate.per_item_amount, BigDecimal::from_str("0.15").unwrap());
        assert_eq!(estimate.total, BigDecimal::from_str("1.15").unwrap());
    }

    #[test]
    fn test_zero_hints_zero_impact() {
        let estimate = estimate_impact(&BigDecimal::from(500), 0.0, &BigDecimal::from(0));
        assert_eq!(estimate.total, BigDecimal::from(0));
    }

    #[test]
    fn test_zero_amount_keeps_per_item_component() {
        let estimate = estimate_impact(
            &BigDecimal::from(0),
            25.0,
            &BigDecimal::from_str("0.30").unwrap(),
        );
        assert_eq!(estimate.bps_amount, BigDecimal::from(0));
        assert_eq!(estimate.total, BigDecimal::from_str("0.30").unwrap());
    }

    #[test]
    fn test_non_finite_bps_degrades_to_zero() {
        let estimate = estimate_impact(&BigDecimal::from(100), f64::NAN, &BigDecimal::from(0));
        assert_eq!(estimate.total, BigDecimal::from(0));
    }
}
