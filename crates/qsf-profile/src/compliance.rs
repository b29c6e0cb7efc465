//! Compliance rule descriptors, dispatched on the profile's compliance tag.
//!
//! This module holds the rule *data*; the gate evaluators that run equity
//! and exposure series against these rules live with the validation gates.
//! Rule tables ship as profile JSON, never as code.

use serde::{Deserialize, Serialize};

/// How a prop firm measures trailing drawdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingDrawdownType {
    /// Peak tracks every equity point, including intraday highs.
    Intraday,
    /// Peak tracks end-of-day equity only.
    Eod,
    /// Fixed floor below the initial balance; the peak never trails.
    Fixed,
}

/// One prop firm's rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmRules {
    pub name: String,
    /// Max loss in one trading day, in account currency.
    pub daily_loss_limit: f64,
    /// Max drawdown from the tracked peak, in account currency.
    pub trailing_dd_limit: f64,
    pub trailing_dd_type: TrailingDrawdownType,
    /// Max share of total profit a single day may contribute (0..=1).
    pub consistency_pct: f64,
}

/// One tier of an exchange leverage table. Tiers are matched by position
/// notional; the first tier whose cap covers the notional applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageTier {
    /// Upper bound (inclusive) of position notional this tier covers.
    pub notional_cap: f64,
    pub max_leverage: f64,
}

/// Closed compliance sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComplianceModel {
    /// A static list of firm rule sets; promotion requires at least
    /// `min_passing` of them to pass.
    #[serde(rename = "prop-firm", rename_all = "camelCase")]
    PropFirm {
        firms: Vec<FirmRules>,
        min_passing: u32,
    },
    /// Tiered exchange rules checked per bar.
    #[serde(rename = "exchange-rules", rename_all = "camelCase")]
    ExchangeRules {
        /// Sorted ascending by `notional_cap`.
        leverage_tiers: Vec<LeverageTier>,
        /// Margin buffer above the liquidation threshold (fraction).
        liquidation_buffer_pct: f64,
        max_position_notional: f64,
    },
}

impl ComplianceModel {
    pub fn tag(&self) -> &'static str {
        match self {
            ComplianceModel::PropFirm { .. } => "prop-firm",
            ComplianceModel::ExchangeRules { .. } => "exchange-rules",
        }
    }
}

/// Find the leverage tier covering `notional`. `None` when the notional
/// exceeds every tier cap.
pub fn find_tier(tiers: &[LeverageTier], notional: f64) -> Option<&LeverageTier> {
    tiers.iter().find(|t| notional <= t.notional_cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliance_tags_match_profile_json() {
        let json = r#"{
            "type": "prop-firm",
            "minPassing": 3,
            "firms": [{
                "name": "alpha-funding",
                "dailyLossLimit": 2000.0,
                "trailingDdLimit": 4000.0,
                "trailingDdType": "eod",
                "consistencyPct": 0.4
            }]
        }"#;
        let model: ComplianceModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.tag(), "prop-firm");
    }

    #[test]
    fn tier_lookup_takes_first_covering_cap() {
        let tiers = [
            LeverageTier {
                notional_cap: 50_000.0,
                max_leverage: 20.0,
            },
            LeverageTier {
                notional_cap: 250_000.0,
                max_leverage: 10.0,
            },
        ];
        assert_eq!(find_tier(&tiers, 10_000.0).unwrap().max_leverage, 20.0);
        assert_eq!(find_tier(&tiers, 50_000.0).unwrap().max_leverage, 20.0);
        assert_eq!(find_tier(&tiers, 50_001.0).unwrap().max_leverage, 10.0);
        assert!(find_tier(&tiers, 300_000.0).is_none());
    }
}
