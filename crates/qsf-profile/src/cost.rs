//! Round-trip cost models, dispatched on the profile's cost-model tag.

use serde::{Deserialize, Serialize};

/// The trade being costed. Contracts matter for `per_contract`, notional
/// and hold duration for `percentage`; the unused fields are ignored by the
/// other variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeCosting {
    pub contracts: f64,
    pub notional: f64,
    pub hold_hours: f64,
}

/// Closed cost-model sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostModel {
    /// Fixed per-unit costs: commission and tick-denominated slippage, both
    /// charged on entry and exit.
    #[serde(rename_all = "camelCase")]
    PerContract {
        commission: f64,
        slippage_ticks: f64,
        tick_value: f64,
    },
    /// Percentage costs with funding: exchange fees, bps slippage, and a
    /// funding charge per 8-hour period held (partial periods round up).
    #[serde(rename_all = "camelCase")]
    Percentage {
        maker_fee: f64,
        taker_fee: f64,
        slippage_bps: f64,
        funding_rate_avg: f64,
    },
}

impl CostModel {
    /// Total round-trip cost for one trade, in account currency.
    pub fn round_trip_cost(&self, trade: &TradeCosting) -> f64 {
        match self {
            CostModel::PerContract {
                commission,
                slippage_ticks,
                tick_value,
            } => (commission * 2.0 + slippage_ticks * tick_value * 2.0) * trade.contracts,
            CostModel::Percentage {
                maker_fee,
                taker_fee,
                slippage_bps,
                funding_rate_avg,
            } => {
                let fees = trade.notional * (maker_fee + taker_fee);
                let slippage = trade.notional * slippage_bps / 10_000.0;
                let funding_periods = (trade.hold_hours / 8.0).ceil().max(0.0);
                let funding = trade.notional * funding_rate_avg * funding_periods;
                fees + slippage + funding
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            CostModel::PerContract { .. } => "per_contract",
            CostModel::Percentage { .. } => "percentage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_contract_charges_both_sides() {
        let model = CostModel::PerContract {
            commission: 2.50,
            slippage_ticks: 1.0,
            tick_value: 12.5,
        };
        let cost = model.round_trip_cost(&TradeCosting {
            contracts: 2.0,
            notional: 0.0,
            hold_hours: 0.0,
        });
        // (2.50*2 + 1*12.5*2) * 2 = 60
        assert!((cost - 60.0).abs() < 1e-9);
    }

    #[test]
    fn percentage_matches_btc_perp_example() {
        // 50k notional, 8h hold: entry fee 25, exit fee 25, slippage 25,
        // one funding period of 5. Total 80.
        let model = CostModel::Percentage {
            maker_fee: 0.0005,
            taker_fee: 0.0005,
            slippage_bps: 5.0,
            funding_rate_avg: 0.0001,
        };
        let cost = model.round_trip_cost(&TradeCosting {
            contracts: 0.0,
            notional: 50_000.0,
            hold_hours: 8.0,
        });
        assert!((cost - 80.0).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn funding_periods_round_up() {
        let model = CostModel::Percentage {
            maker_fee: 0.0,
            taker_fee: 0.0,
            slippage_bps: 0.0,
            funding_rate_avg: 0.0001,
        };
        let one = model.round_trip_cost(&TradeCosting {
            contracts: 0.0,
            notional: 10_000.0,
            hold_hours: 0.5,
        });
        let two = model.round_trip_cost(&TradeCosting {
            contracts: 0.0,
            notional: 10_000.0,
            hold_hours: 8.5,
        });
        assert!((one - 1.0).abs() < 1e-9);
        assert!((two - 2.0).abs() < 1e-9);
    }

    #[test]
    fn tags_match_profile_json() {
        let json = r#"{"type":"per_contract","commission":2.5,"slippageTicks":1.0,"tickValue":12.5}"#;
        let model: CostModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.tag(), "per_contract");
    }
}
