//! `qsf health [--category ...]`
//!
//! Named checks, each pass/warn/fail with a message and duration. Exit 0
//! iff no check fails; otherwise exit 2 (unhealthy).

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use chrono::Utc;

use qsf_config::load_layered_json;
use qsf_data::scan_data_dir;
use qsf_profile::ProfileRegistry;
use qsf_queue::QueueRoot;
use qsf_schemas::{ProjectLayout, QueueName};
use qsf_supervisor::SupervisorLock;

use crate::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

struct CheckResult {
    category: &'static str,
    name: &'static str,
    status: CheckStatus,
    message: String,
    duration_ms: u128,
}

pub async fn run(root: &Path, category: Option<&str>) -> ExitCode {
    let categories: Vec<&str> = match category {
        Some(c) => vec![c],
        None => vec!["system", "project", "data", "runtime"],
    };

    let mut results = Vec::new();
    for cat in &categories {
        match *cat {
            "system" => system_checks(root, &mut results).await,
            "project" => project_checks(root, &mut results),
            "data" => data_checks(root, &mut results),
            "runtime" => runtime_checks(root, &mut results),
            other => {
                eprintln!(
                    "{} unknown category: {other} (system|project|data|runtime)",
                    style::badge_fail("error")
                );
                return ExitCode::FAILURE;
            }
        }
    }

    let mut failed = false;
    let mut current = "";
    for r in &results {
        if r.category != current {
            current = r.category;
            println!("{}", style::label(current));
        }
        let badge = match r.status {
            CheckStatus::Pass => style::badge_pass("pass"),
            CheckStatus::Warn => style::badge_warn("warn"),
            CheckStatus::Fail => {
                failed = true;
                style::badge_fail("fail")
            }
        };
        println!("  {badge} {:<28} {} ({}ms)", r.name, r.message, r.duration_ms);
    }

    if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn timed(
    category: &'static str,
    name: &'static str,
    check: impl FnOnce() -> (CheckStatus, String),
) -> CheckResult {
    let start = Instant::now();
    let (status, message) = check();
    CheckResult {
        category,
        name,
        status,
        message,
        duration_ms: start.elapsed().as_millis(),
    }
}

// ---------------------------------------------------------------------------
// system
// ---------------------------------------------------------------------------

async fn system_checks(root: &Path, out: &mut Vec<CheckResult>) {
    let start = Instant::now();
    let tmux = tokio::process::Command::new("tmux")
        .arg("-V")
        .output()
        .await;
    out.push(CheckResult {
        category: "system",
        name: "tmux available",
        status: if tmux.as_ref().map(|o| o.status.success()).unwrap_or(false) {
            CheckStatus::Pass
        } else {
            CheckStatus::Warn
        },
        message: match tmux {
            Ok(o) if o.status.success() => {
                String::from_utf8_lossy(&o.stdout).trim().to_string()
            }
            _ => "tmux not found (iTerm2 profile still possible)".to_string(),
        },
        duration_ms: start.elapsed().as_millis(),
    });

    out.push(timed("system", "project root writable", || {
        let probe = root.join(".qsf-health-probe");
        match std::fs::write(&probe, b"probe") {
            Ok(()) => {
                let _ = std::fs::remove_file(&probe);
                (CheckStatus::Pass, "write + unlink ok".to_string())
            }
            Err(e) => (CheckStatus::Fail, e.to_string()),
        }
    }));

    out.push(timed("system", "single filesystem", || {
        same_device_check(root)
    }));
}

/// `queues/`, `output/` and `checkpoints/` must share a device: atomic
/// renames do not cross filesystems.
#[cfg(unix)]
fn same_device_check(root: &Path) -> (CheckStatus, String) {
    use std::os::unix::fs::MetadataExt;

    let layout = ProjectLayout::new(root);
    let dirs = [
        layout.queues_dir(),
        layout.output_dir(),
        layout.checkpoints_dir(),
    ];
    let mut devices = Vec::new();
    for d in &dirs {
        match std::fs::metadata(d) {
            Ok(m) => devices.push(m.dev()),
            Err(_) => return (CheckStatus::Warn, format!("{} missing", d.display())),
        }
    }
    if devices.windows(2).all(|w| w[0] == w[1]) {
        (CheckStatus::Pass, "queues/output/checkpoints share a device".to_string())
    } else {
        (
            CheckStatus::Fail,
            "queues/output/checkpoints span filesystems; renames are not atomic".to_string(),
        )
    }
}

#[cfg(not(unix))]
fn same_device_check(_root: &Path) -> (CheckStatus, String) {
    (CheckStatus::Warn, "device check unsupported on this platform".to_string())
}

// ---------------------------------------------------------------------------
// project
// ---------------------------------------------------------------------------

fn project_checks(root: &Path, out: &mut Vec<CheckResult>) {
    let layout = ProjectLayout::new(root);

    out.push(timed("project", "config parses", || {
        match load_layered_json(&[&layout.config_file()]).and_then(|l| l.factory()) {
            Ok(_) => (CheckStatus::Pass, "config.json ok".to_string()),
            Err(e) => (CheckStatus::Fail, format!("{e:#}")),
        }
    }));

    out.push(timed("project", "active profile loads", || {
        match ProfileRegistry::load(root) {
            Ok(reg) => (
                CheckStatus::Pass,
                format!("{} ({})", reg.active_name(), reg.active().market_type),
            ),
            Err(e) => (CheckStatus::Fail, e.to_string()),
        }
    }));

    out.push(timed("project", "queue layout", || {
        let missing: Vec<&str> = QueueName::all()
            .into_iter()
            .filter(|q| !layout.queues_dir().join(q.dir_name()).is_dir())
            .map(|q| q.dir_name())
            .collect();
        if missing.is_empty() {
            (CheckStatus::Pass, "all six queue dirs present".to_string())
        } else {
            (CheckStatus::Warn, format!("missing: {}", missing.join(", ")))
        }
    }));

    out.push(timed("project", "patterns dir", || {
        if layout.patterns_dir().is_dir() {
            (CheckStatus::Pass, "present".to_string())
        } else {
            (CheckStatus::Warn, "patterns/ missing (created at start)".to_string())
        }
    }));
}

// ---------------------------------------------------------------------------
// data
// ---------------------------------------------------------------------------

fn data_checks(root: &Path, out: &mut Vec<CheckResult>) {
    out.push(timed("data", "sample data present", || {
        let Ok(registry) = ProfileRegistry::load(root) else {
            return (CheckStatus::Warn, "no active profile".to_string());
        };
        let dir = root.join(&registry.active().sample_data_dir);
        match scan_data_dir(&dir) {
            Ok(inv) if !inv.is_empty() => (
                CheckStatus::Pass,
                format!("{} files, {}", inv.files.len(), style::human_bytes(inv.total_bytes)),
            ),
            Ok(_) => (
                CheckStatus::Warn,
                format!("{} is empty; backtests will block", dir.display()),
            ),
            Err(e) => (CheckStatus::Fail, format!("{e:#}")),
        }
    }));
}

// ---------------------------------------------------------------------------
// runtime
// ---------------------------------------------------------------------------

fn runtime_checks(root: &Path, out: &mut Vec<CheckResult>) {
    let layout = ProjectLayout::new(root);

    out.push(timed("runtime", "supervisor lock", || {
        match SupervisorLock::read(&layout.supervisor_lock_file()) {
            Ok(None) => (CheckStatus::Pass, "no lock (swarm stopped)".to_string()),
            Ok(Some(info)) => {
                if SupervisorLock::held_by_live_owner(&layout.supervisor_lock_file()) {
                    (CheckStatus::Pass, format!("held by live pid {}", info.pid))
                } else {
                    (
                        CheckStatus::Warn,
                        format!("stale lock from dead pid {} (next start replaces it)", info.pid),
                    )
                }
            }
            Err(e) => (CheckStatus::Fail, format!("{e:#}")),
        }
    }));

    out.push(timed("runtime", "orphaned claims", || {
        let queues = QueueRoot::new(layout.queues_dir());
        let mut claimed = 0usize;
        for q in qsf_schemas::WORK_QUEUES {
            match queues.depths(q) {
                Ok(d) => claimed += d.in_progress,
                Err(_) => return (CheckStatus::Warn, "queues unreadable".to_string()),
            }
        }
        let running = SupervisorLock::held_by_live_owner(&layout.supervisor_lock_file());
        if claimed == 0 || running {
            (CheckStatus::Pass, format!("{claimed} in progress"))
        } else {
            (
                CheckStatus::Warn,
                format!("{claimed} claims with no supervisor; recovery will revert them"),
            )
        }
    }));

    out.push(timed("runtime", "failed backlog", || {
        let queues = QueueRoot::new(layout.queues_dir());
        match queues.depths(QueueName::Failed) {
            Ok(d) if d.pending == 0 => (CheckStatus::Pass, "failed/ is empty".to_string()),
            Ok(d) => (CheckStatus::Warn, format!("{} failed items", d.pending)),
            Err(_) => (CheckStatus::Warn, "failed/ unreadable".to_string()),
        }
    }));

    out.push(timed("runtime", "heartbeat freshness", || {
        let store = qsf_checkpoint::CheckpointStore::new(layout.checkpoints_dir());
        match store.list() {
            Ok(cps) if cps.is_empty() => {
                (CheckStatus::Pass, "no checkpoints yet".to_string())
            }
            Ok(cps) => {
                let now = Utc::now();
                let oldest = cps
                    .iter()
                    .map(|cp| (now - cp.last_heartbeat).num_seconds())
                    .max()
                    .unwrap_or(0);
                if !SupervisorLock::held_by_live_owner(&layout.supervisor_lock_file()) {
                    (CheckStatus::Pass, "swarm stopped; heartbeats historical".to_string())
                } else if oldest < 600 {
                    (CheckStatus::Pass, format!("oldest heartbeat {oldest}s"))
                } else {
                    (CheckStatus::Warn, format!("oldest heartbeat {oldest}s"))
                }
            }
            Err(e) => (CheckStatus::Fail, format!("{e:#}")),
        }
    }));
}
