//! qsf-backtest
//!
//! The result-JSON shapes the validation gates consume, and the engine
//! boundary trait. The backtest math itself is an external collaborator;
//! this crate owns only the contract: what a backtest hands back, and what
//! the gates can rely on being present.

mod engine;
mod types;

pub use engine::{BacktestEngine, BacktestRequest, EngineError, WalkForwardSpec};
pub use types::{
    BacktestSummary, BarExposure, BaseHit, ComplianceReport, CostBreakdown, DailyPnl,
    EquityPoint, FirmResult, OptimizationSummary, TierViolation,
};
