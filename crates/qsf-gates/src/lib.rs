//! qsf-gates
//!
//! Validation gates applied to candidate artifacts before routing. Gates
//! are pure functions of the artifact JSON: same input, same decision,
//! no IO.
//!
//! A gate rejection is a routing outcome, not an error. It never
//! increments a worker's failure counter and never lands in `failed/`.

mod compliance;
mod evaluator;
mod thresholds;

pub use compliance::evaluate_compliance;
pub use evaluator::{evaluate_backtest, GateDecision, GateReport, GateViolation};
pub use thresholds::GateThresholds;
