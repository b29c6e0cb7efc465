//! Backtest / optimization / compliance result shapes.
//!
//! These structs mirror the artifact JSON files byte-for-byte (camelCase
//! keys): `backtest.json`, `optimization.json`, `base_hit.json`,
//! `compliance.json`. The gates are pure functions over these shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One equity curve point: (UTC epoch seconds, account equity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: i64,
    pub equity: f64,
}

/// One trading day's realized P&L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPnl {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub pnl: f64,
}

/// Per-bar exposure series for exchange-rule compliance checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarExposure {
    pub ts: i64,
    pub leverage: f64,
    pub margin_ratio: f64,
    pub position_notional: f64,
}

/// Cost block. A missing block, or zero commission AND zero slippage, is an
/// auto-reject: a costless backtest is not evidence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostBreakdown {
    pub commission: f64,
    pub slippage: f64,
    pub fees: f64,
    pub funding: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.commission + self.slippage + self.fees + self.funding
    }

    /// True when the block carries no commission and no slippage at all.
    pub fn is_costless(&self) -> bool {
        self.commission == 0.0 && self.slippage == 0.0
    }
}

/// `backtest.json`: what the backtester's model pass produced for one
/// strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSummary {
    pub strategy_id: String,
    pub symbols: Vec<String>,
    pub sharpe_in_sample: f64,
    pub sharpe_out_sample: f64,
    pub win_rate: f64,
    pub total_trades: u32,
    pub max_drawdown: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<CostBreakdown>,
    #[serde(default)]
    pub equity_curve: Vec<EquityPoint>,
    #[serde(default)]
    pub daily_pnl: Vec<DailyPnl>,
    /// Present for crypto profiles; exchange compliance runs per bar.
    #[serde(default)]
    pub exposure: Vec<BarExposure>,
}

impl BacktestSummary {
    /// Relative Sharpe decay out of sample: `(IS - OOS) / IS`, with a
    /// non-positive in-sample Sharpe treated as full decay.
    pub fn oos_decay(&self) -> f64 {
        if self.sharpe_in_sample <= 0.0 {
            return 1.0;
        }
        (self.sharpe_in_sample - self.sharpe_out_sample) / self.sharpe_in_sample
    }
}

/// Base-hit (cash-exit) level: a take-profit at the average
/// max-favorable-excursion of losing trades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseHit {
    pub avg_loss_mfe: f64,
    pub take_profit: f64,
    /// Win rate of the cash-exit variant, for the README.
    pub cash_exit_win_rate: f64,
}

/// `optimization.json`: the optimizer's best variant for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSummary {
    pub strategy_id: String,
    pub best_params: Value,
    pub oos_sharpe: f64,
    pub total_trades: u32,
    pub max_drawdown: f64,
    pub base_hit: BaseHit,
}

/// One firm's outcome under a prop-firm compliance run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmResult {
    pub firm: String,
    pub passed: bool,
    /// First violated rule, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// First offending bar under exchange rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierViolation {
    pub ts: i64,
    pub rule: String,
    pub observed: f64,
    pub limit: f64,
}

/// `compliance.json`: the profile-dispatched compliance outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub strategy_id: String,
    /// `prop-firm` or `exchange-rules`.
    pub model: String,
    pub passed: bool,
    #[serde(default)]
    pub firms: Vec<FirmResult>,
    #[serde(default)]
    pub firms_passed: u32,
    #[serde(default)]
    pub min_passing: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_violation: Option<TierViolation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oos_decay_treats_nonpositive_is_as_full_decay() {
        let mut s = BacktestSummary {
            strategy_id: "RSI_ES".into(),
            symbols: vec!["ES".into()],
            sharpe_in_sample: 3.8,
            sharpe_out_sample: 1.1,
            win_rate: 0.55,
            total_trades: 200,
            max_drawdown: 0.12,
            costs: Some(CostBreakdown {
                commission: 2.5,
                ..Default::default()
            }),
            equity_curve: vec![],
            daily_pnl: vec![],
            exposure: vec![],
        };
        assert!((s.oos_decay() - (3.8 - 1.1) / 3.8).abs() < 1e-12);

        s.sharpe_in_sample = 0.0;
        assert_eq!(s.oos_decay(), 1.0);
        s.sharpe_in_sample = -0.5;
        assert_eq!(s.oos_decay(), 1.0);
    }

    #[test]
    fn costless_detection() {
        assert!(CostBreakdown::default().is_costless());
        assert!(!CostBreakdown {
            slippage: 0.1,
            ..Default::default()
        }
        .is_costless());
    }

    #[test]
    fn summary_json_uses_camel_case() {
        let json = r#"{
            "strategyId": "RSI_ES",
            "symbols": ["ES"],
            "sharpeInSample": 1.7,
            "sharpeOutSample": 1.4,
            "winRate": 0.56,
            "totalTrades": 312,
            "maxDrawdown": 0.14,
            "costs": {"commission": 2.5, "slippage": 1.0, "fees": 0.0, "funding": 0.0}
        }"#;
        let s: BacktestSummary = serde_json::from_str(json).unwrap();
        assert_eq!(s.total_trades, 312);
        assert!(!s.costs.unwrap().is_costless());
    }
}
