//! The gate bands: auto-reject, under-review, promote.

use serde::{Deserialize, Serialize};

use qsf_backtest::BacktestSummary;

use crate::thresholds::GateThresholds;

/// Routing outcome for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Promote,
    UnderReview,
    Reject,
}

/// One violated (or shortfallen) threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateViolation {
    /// Stable machine code, e.g. `sharpe_in_sample`.
    pub code: String,
    pub message: String,
    pub observed: f64,
    pub limit: f64,
}

impl GateViolation {
    fn new(code: &str, message: String, observed: f64, limit: f64) -> GateViolation {
        GateViolation {
            code: code.to_string(),
            message,
            observed,
            limit,
        }
    }
}

/// Gate outcome plus every threshold that fired. The violation list feeds
/// `reason.md` and failure-pattern distillation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub decision: GateDecision,
    pub violations: Vec<GateViolation>,
}

impl GateReport {
    pub fn reason_lines(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// Evaluate one backtest summary against the gate bands.
///
/// Band order:
/// 1. any auto-reject threshold fires (all of them are collected) => Reject
/// 2. OOS decay in the review band => UnderReview
/// 3. promotion band shortfalls (OOS Sharpe, drawdown) => UnderReview
/// 4. otherwise => Promote
pub fn evaluate_backtest(summary: &BacktestSummary, thr: &GateThresholds) -> GateReport {
    let decay = summary.oos_decay();
    let mut violations = Vec::new();

    if summary.sharpe_in_sample > thr.max_is_sharpe {
        violations.push(GateViolation::new(
            "sharpe_in_sample",
            format!(
                "in-sample Sharpe {:.2} above overfit limit {:.2}",
                summary.sharpe_in_sample, thr.max_is_sharpe
            ),
            summary.sharpe_in_sample,
            thr.max_is_sharpe,
        ));
    }
    if summary.win_rate > thr.max_win_rate {
        violations.push(GateViolation::new(
            "win_rate",
            format!(
                "win rate {:.2} above limit {:.2}",
                summary.win_rate, thr.max_win_rate
            ),
            summary.win_rate,
            thr.max_win_rate,
        ));
    }
    if summary.total_trades < thr.min_trades {
        violations.push(GateViolation::new(
            "total_trades",
            format!(
                "trade count {} below minimum {}",
                summary.total_trades, thr.min_trades
            ),
            summary.total_trades as f64,
            thr.min_trades as f64,
        ));
    }
    if decay > thr.max_oos_decay {
        violations.push(GateViolation::new(
            "oos_decay",
            format!(
                "OOS Sharpe decay {:.2} above limit {:.2}",
                decay, thr.max_oos_decay
            ),
            decay,
            thr.max_oos_decay,
        ));
    }
    if summary.max_drawdown > thr.max_drawdown {
        violations.push(GateViolation::new(
            "max_drawdown",
            format!(
                "max drawdown {:.2} above limit {:.2}",
                summary.max_drawdown, thr.max_drawdown
            ),
            summary.max_drawdown,
            thr.max_drawdown,
        ));
    }
    match &summary.costs {
        None => violations.push(GateViolation::new(
            "costs",
            "costs block missing".to_string(),
            0.0,
            0.0,
        )),
        Some(c) if c.is_costless() => violations.push(GateViolation::new(
            "costs",
            "zero commission and zero slippage".to_string(),
            0.0,
            0.0,
        )),
        Some(_) => {}
    }

    if !violations.is_empty() {
        return GateReport {
            decision: GateDecision::Reject,
            violations,
        };
    }

    if decay > thr.review_oos_decay {
        return GateReport {
            decision: GateDecision::UnderReview,
            violations: vec![GateViolation::new(
                "oos_decay",
                format!(
                    "OOS Sharpe decay {:.2} in review band ({:.2}..{:.2}]",
                    decay, thr.review_oos_decay, thr.max_oos_decay
                ),
                decay,
                thr.review_oos_decay,
            )],
        };
    }

    // Promotion band: survived auto-reject, decay fine, but not promotable
    // without enough OOS Sharpe and a tighter drawdown.
    let mut shortfalls = Vec::new();
    if summary.sharpe_out_sample < thr.pass_min_oos_sharpe {
        shortfalls.push(GateViolation::new(
            "oos_sharpe",
            format!(
                "OOS Sharpe {:.2} below promotion minimum {:.2}",
                summary.sharpe_out_sample, thr.pass_min_oos_sharpe
            ),
            summary.sharpe_out_sample,
            thr.pass_min_oos_sharpe,
        ));
    }
    if summary.max_drawdown > thr.pass_max_drawdown {
        shortfalls.push(GateViolation::new(
            "max_drawdown",
            format!(
                "max drawdown {:.2} above promotion limit {:.2}",
                summary.max_drawdown, thr.pass_max_drawdown
            ),
            summary.max_drawdown,
            thr.pass_max_drawdown,
        ));
    }

    if shortfalls.is_empty() {
        GateReport {
            decision: GateDecision::Promote,
            violations: Vec::new(),
        }
    } else {
        GateReport {
            decision: GateDecision::UnderReview,
            violations: shortfalls,
        }
    }
}
