//! The backtest engine boundary.
//!
//! This module defines only the request types and the trait. No concrete
//! engine, no math. Walk-forward is time-ordered train/test windows; no
//! shuffling is ever implied by this contract.

use std::fmt;
use std::path::PathBuf;

use crate::types::BacktestSummary;

/// Walk-forward window layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkForwardSpec {
    pub train_days: u32,
    pub test_days: u32,
    pub folds: u32,
}

/// A request to run one strategy over one data set.
#[derive(Debug, Clone)]
pub struct BacktestRequest {
    pub strategy_path: PathBuf,
    pub data_path: PathBuf,
    pub walk_forward: WalkForwardSpec,
}

/// Errors an engine implementation may return.
#[derive(Debug)]
pub enum EngineError {
    /// Strategy code failed to load or run.
    Strategy(String),
    /// The data set is missing, empty, or unreadable.
    Data(String),
    /// The engine produced output the summary shape cannot hold.
    Decode(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Strategy(msg) => write!(f, "strategy error: {msg}"),
            EngineError::Data(msg) => write!(f, "data error: {msg}"),
            EngineError::Decode(msg) => write!(f, "engine decode error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Engine boundary. Implementations live outside the substrate.
pub trait BacktestEngine {
    fn run(&self, req: &BacktestRequest) -> Result<BacktestSummary, EngineError>;
}
