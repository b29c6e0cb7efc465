//! One snapshot struct for all status surfaces (one-shot, JSON, TUI).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use qsf_artifacts::{Bucket, StrategiesRoot};
use qsf_config::load_layered_json;
use qsf_profile::ProfileRegistry;
use qsf_queue::QueueRoot;
use qsf_schemas::{ProjectLayout, WORK_QUEUES};
use qsf_supervisor::{PaneHealth, Supervisor, WorkerState};
use qsf_worker::CostTracker;

#[derive(Debug, Clone, Serialize)]
pub struct WorkerRow {
    pub pane: u32,
    pub role: String,
    pub health: String,
    pub heartbeat_age_secs: Option<i64>,
    pub tasks_completed: u32,
    pub consecutive_failures: u32,
    pub last_error_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueRow {
    pub name: String,
    pub pending: usize,
    pub in_progress: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketRow {
    pub name: String,
    pub count: usize,
}

/// The `status` contract: `--json` emits exactly this shape.
#[derive(Debug, Clone, Serialize)]
pub struct FactorySnapshot {
    pub captured_at: DateTime<Utc>,
    pub session_active: bool,
    pub mode: String,
    pub active_profile: String,
    pub config_hash: String,
    pub workers: Vec<WorkerRow>,
    pub queues: Vec<QueueRow>,
    pub buckets: Vec<BucketRow>,
    pub archived_completed: usize,
    pub archived_failed: usize,
    pub lifetime_cost_usd: f64,
}

pub fn capture(root: &Path) -> Result<FactorySnapshot> {
    let layout = ProjectLayout::new(root);

    let loaded = load_layered_json(&[&layout.config_file()])
        .with_context(|| format!("load config under {}", root.display()))?;
    let registry = ProfileRegistry::load(root)?;
    let profile = registry.active();

    let supervisor = Supervisor::open(root, std::env::current_exe().unwrap_or_default())?;
    let workers = supervisor
        .worker_states()?
        .into_iter()
        .map(worker_row)
        .collect();

    let queues_root = QueueRoot::new(layout.queues_dir());
    queues_root.ensure_layout()?;
    let mut queues = Vec::new();
    for q in WORK_QUEUES {
        let d = queues_root.depths(q)?;
        queues.push(QueueRow {
            name: q.dir_name().to_string(),
            pending: d.pending,
            in_progress: d.in_progress,
        });
    }
    let archived_completed = queues_root.depths(qsf_schemas::QueueName::Completed)?.pending;
    let archived_failed = queues_root.depths(qsf_schemas::QueueName::Failed)?.pending;

    let strategies = StrategiesRoot::new(layout.strategies_dir());
    let mut buckets = Vec::new();
    for bucket in [
        Bucket::Validated(profile.validated_dir.clone()),
        Bucket::Good,
        Bucket::UnderReview,
        Bucket::Rejected,
    ] {
        buckets.push(BucketRow {
            name: bucket.dir_name().to_string(),
            count: strategies.list_bucket(&bucket)?.len(),
        });
    }

    let cost = CostTracker::load(&layout.cost_tracker_file())?;

    Ok(FactorySnapshot {
        captured_at: Utc::now(),
        session_active: supervisor.is_running(),
        mode: profile.market_type.as_str().to_string(),
        active_profile: profile.name.clone(),
        config_hash: loaded.config_hash,
        workers,
        queues,
        buckets,
        archived_completed,
        archived_failed,
        lifetime_cost_usd: cost.lifetime_cost_usd,
    })
}

fn worker_row(state: WorkerState) -> WorkerRow {
    WorkerRow {
        pane: state.pane,
        role: state.role.as_str().to_string(),
        health: match state.health {
            PaneHealth::Running => "running",
            PaneHealth::Quiet => "quiet",
            PaneHealth::Stale => "stale",
            PaneHealth::NeverStarted => "idle",
        }
        .to_string(),
        heartbeat_age_secs: state.heartbeat_age_secs,
        tasks_completed: state.tasks_completed,
        consecutive_failures: state.consecutive_failures,
        last_error_kind: state.last_error_kind.map(|k| k.as_str().to_string()),
    }
}
