//! `cost-tracker.json`: lifetime estimated-cost accounting across sessions.
//!
//! Real token counts are not available; sessions accrue a fixed estimated
//! cost per task and fold their totals in here at session end. The file is
//! advisory (status display), so last-writer-wins across panes is
//! acceptable; writes are still atomic so readers never see a torn file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostTracker {
    pub lifetime_cost_usd: f64,
    pub lifetime_tasks: u64,
    /// Per-role accumulated cost.
    pub by_role: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CostTracker {
    pub fn load(path: &Path) -> Result<CostTracker> {
        match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("parse cost tracker: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CostTracker::default()),
            Err(e) => Err(e).with_context(|| format!("read cost tracker: {}", path.display())),
        }
    }

    /// Fold one session's totals in and write back atomically.
    pub fn record_session(
        path: &Path,
        role: &str,
        session_cost_usd: f64,
        session_tasks: u64,
    ) -> Result<CostTracker> {
        let mut tracker = CostTracker::load(path)?;
        tracker.lifetime_cost_usd += session_cost_usd;
        tracker.lifetime_tasks += session_tasks;
        *tracker.by_role.entry(role.to_string()).or_insert(0.0) += session_cost_usd;
        tracker.updated_at = Some(Utc::now());

        let json = serde_json::to_string_pretty(&tracker).context("serialize cost tracker")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, format!("{json}\n"))
            .with_context(|| format!("write cost tracker temp: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("publish cost tracker: {}", path.display()))?;
        Ok(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost-tracker.json");

        CostTracker::record_session(&path, "backtester", 1.5, 3).unwrap();
        let t = CostTracker::record_session(&path, "optimizer", 0.5, 1).unwrap();

        assert!((t.lifetime_cost_usd - 2.0).abs() < 1e-9);
        assert_eq!(t.lifetime_tasks, 4);
        assert!((t.by_role["backtester"] - 1.5).abs() < 1e-9);
    }
}
