//! Typed view of `config.json`.
//!
//! The loader keeps the merged document as untyped JSON (the hash is over
//! that); this module extracts the fields the orchestration layer consumes.
//! Unknown keys are tolerated; profiles and gates read their own sections.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Worker pane counts per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerCounts {
    pub researcher: u32,
    pub converter: u32,
    pub backtester: u32,
    pub optimizer: u32,
}

impl Default for WorkerCounts {
    fn default() -> Self {
        Self {
            researcher: 1,
            converter: 1,
            backtester: 1,
            optimizer: 1,
        }
    }
}

impl WorkerCounts {
    pub fn total(&self) -> u32 {
        self.researcher + self.converter + self.backtester + self.optimizer
    }
}

/// Crash/failure governance knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecoveryConfig {
    /// Consecutive task failures that end a session.
    pub max_consecutive_failures: u32,
    /// A claim whose owner's heartbeat is older than
    /// `multiplier × sessionTimeout` is revertible.
    pub stale_claim_multiplier: u32,
    /// Grace window for an in-flight model pass at stop time.
    pub graceful_stop_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            stale_claim_multiplier: 3,
            graceful_stop_secs: 10,
        }
    }
}

/// Per-session budget accounting. Real token counts are not available, so
/// cost is estimated as a fixed per-task constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetConfig {
    pub estimated_cost_per_task_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            estimated_cost_per_task_usd: 0.50,
        }
    }
}

/// How a worker pane invokes the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelConfig {
    /// Executable the pane runs for each task pass.
    pub command: String,
    pub args: Vec<String>,
    /// Per-task soft deadline.
    pub task_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec![],
            task_timeout_secs: 600,
        }
    }
}

/// Terminal multiplexer hosting the panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiplexerKind {
    #[default]
    Tmux,
    Iterm2,
}

/// The orchestration-level slice of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FactoryConfig {
    pub workers: WorkerCounts,
    pub recovery: RecoveryConfig,
    pub budget: BudgetConfig,
    pub model: ModelConfig,
    pub multiplexer: MultiplexerKind,
    /// Queue poll cadence when a worker finds no work.
    pub poll_interval_secs: u64,
    /// tmux session name (one window, N panes).
    pub session_name: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            workers: WorkerCounts::default(),
            recovery: RecoveryConfig::default(),
            budget: BudgetConfig::default(),
            model: ModelConfig::default(),
            multiplexer: MultiplexerKind::default(),
            poll_interval_secs: 15,
            session_name: "qsf".to_string(),
        }
    }
}

impl FactoryConfig {
    pub fn from_value(v: &Value) -> Result<FactoryConfig> {
        serde_json::from_value(v.clone()).context("config.json: malformed factory section")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = FactoryConfig::from_value(&json!({})).unwrap();
        assert_eq!(cfg.recovery.max_consecutive_failures, 3);
        assert_eq!(cfg.recovery.stale_claim_multiplier, 3);
        assert_eq!(cfg.recovery.graceful_stop_secs, 10);
        assert_eq!(cfg.workers.total(), 4);
    }

    #[test]
    fn camel_case_keys_are_honored() {
        let cfg = FactoryConfig::from_value(&json!({
            "workers": {"backtester": 2},
            "recovery": {"maxConsecutiveFailures": 5},
            "pollIntervalSecs": 3,
            "model": {"command": "fake-model", "taskTimeoutSecs": 30}
        }))
        .unwrap();
        assert_eq!(cfg.workers.backtester, 2);
        assert_eq!(cfg.workers.researcher, 1, "unset counts keep defaults");
        assert_eq!(cfg.recovery.max_consecutive_failures, 5);
        assert_eq!(cfg.poll_interval_secs, 3);
        assert_eq!(cfg.model.command, "fake-model");
    }
}
