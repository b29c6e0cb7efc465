//! Gate thresholds, overridable from the `validation` section of
//! `config.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All thresholds are half-open: an observation exactly at a limit passes
/// the limit it sits on. Sharpe 3.0 in sample is fine; 3.01 rejects.
/// 100 trades is fine; 99 rejects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateThresholds {
    /// In-sample Sharpe above this is an overfit signal.
    pub max_is_sharpe: f64,
    pub max_win_rate: f64,
    pub min_trades: u32,
    /// OOS decay above this auto-rejects.
    pub max_oos_decay: f64,
    /// OOS decay above this (but within `max_oos_decay`) routes to review.
    pub review_oos_decay: f64,
    pub max_drawdown: f64,
    /// Promotion band: minimum out-of-sample Sharpe.
    pub pass_min_oos_sharpe: f64,
    /// Promotion band: maximum drawdown.
    pub pass_max_drawdown: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            max_is_sharpe: 3.0,
            max_win_rate: 0.80,
            min_trades: 100,
            max_oos_decay: 0.50,
            review_oos_decay: 0.30,
            max_drawdown: 0.30,
            pass_min_oos_sharpe: 1.0,
            pass_max_drawdown: 0.20,
        }
    }
}

impl GateThresholds {
    /// Read the `validation` section of the merged config; absent keys keep
    /// their defaults.
    pub fn from_config(config: &Value) -> Result<GateThresholds> {
        match config.get("validation") {
            Some(section) => serde_json::from_value(section.clone())
                .context("config.json: malformed validation section"),
            None => Ok(GateThresholds::default()),
        }
    }
}
