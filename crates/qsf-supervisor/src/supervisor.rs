//! Supervisor operations: start, stop, pause, liveness, recovery.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use qsf_checkpoint::CheckpointStore;
use qsf_config::{load_layered_json, FactoryConfig};
use qsf_profile::{Profile, ProfileRegistry};
use qsf_queue::{revert_stale_claims, QueueRoot};
use qsf_schemas::{ItemId, ProjectLayout, WorkerRole, ALL_ROLES};

use crate::lock::SupervisorLock;
use crate::mux::{Multiplexer, PaneCommand};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("a supervisor is already running for this project root")]
    AlreadyRunning,
    #[error("pane launch failed: {0}")]
    PaneLaunchFailed(String),
}

/// One pane slot in the fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneSpec {
    pub pane: u32,
    pub role: WorkerRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    Graceful,
    Force,
}

/// Liveness derived from checkpoint heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneHealth {
    /// Heartbeat within the poll window.
    Running,
    /// Heartbeat present but aging (pane may be mid model pass).
    Quiet,
    /// Heartbeat older than the staleness window.
    Stale,
    /// No checkpoint at all.
    NeverStarted,
}

/// One row of `status` output.
#[derive(Debug, Clone)]
pub struct WorkerState {
    pub pane: u32,
    pub role: WorkerRole,
    pub health: PaneHealth,
    pub heartbeat_age_secs: Option<i64>,
    pub tasks_completed: u32,
    pub consecutive_failures: u32,
    pub last_error_kind: Option<qsf_schemas::ErrorKind>,
    pub last_claimed_item: Option<ItemId>,
}

/// The supervisor for one project root.
pub struct Supervisor {
    layout: ProjectLayout,
    config: FactoryConfig,
    profile: Profile,
    mux: Multiplexer,
    /// Binary run inside each pane (the CLI itself, `worker` subcommand).
    worker_bin: PathBuf,
}

impl Supervisor {
    pub fn open(root: impl Into<PathBuf>, worker_bin: PathBuf) -> Result<Supervisor> {
        let layout = ProjectLayout::new(root);
        let loaded = load_layered_json(&[&layout.config_file()])
            .with_context(|| format!("load config under {}", layout.root().display()))?;
        let config = loaded.factory()?;
        let profile = ProfileRegistry::load(layout.root())?.active().clone();
        let mux = Multiplexer::new(config.multiplexer, config.session_name.clone());

        Ok(Supervisor {
            layout,
            config,
            profile,
            mux,
            worker_bin,
        })
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Fixed pane layout from the config worker counts: panes are numbered
    /// from 1, grouped by role in pipeline order.
    pub fn pane_layout(&self) -> Vec<PaneSpec> {
        let counts = |role: WorkerRole| match role {
            WorkerRole::Researcher => self.config.workers.researcher,
            WorkerRole::Converter => self.config.workers.converter,
            WorkerRole::Backtester => self.config.workers.backtester,
            WorkerRole::Optimizer => self.config.workers.optimizer,
        };

        let mut panes = Vec::new();
        let mut next = 1u32;
        for role in ALL_ROLES {
            for _ in 0..counts(role) {
                panes.push(PaneSpec { pane: next, role });
                next += 1;
            }
        }
        panes
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    /// Launch the full swarm.
    pub async fn start_all(&self) -> Result<()> {
        self.start_panes(self.pane_layout()).await
    }

    /// Launch only the panes of one role.
    pub async fn start_worker(&self, role: WorkerRole) -> Result<()> {
        let panes: Vec<PaneSpec> = self
            .pane_layout()
            .into_iter()
            .filter(|p| p.role == role)
            .collect();
        self.start_panes(panes).await
    }

    async fn start_panes(&self, panes: Vec<PaneSpec>) -> Result<()> {
        let lock_path = self.layout.supervisor_lock_file();
        let Some(_lock) = SupervisorLock::acquire(&lock_path, self.mux.session_name())? else {
            return Err(SupervisorError::AlreadyRunning.into());
        };

        // A fresh start clears old control flags.
        let _ = fs::remove_file(self.layout.stop_signal_file());
        let _ = fs::remove_file(self.layout.pause_signal_file());
        self.ensure_dirs()?;

        // Recover anything a previous crashed swarm left claimed.
        let reverted = self.recover()?;
        if !reverted.is_empty() {
            info!(count = reverted.len(), "reverted orphaned claims before start");
        }

        let commands: Vec<PaneCommand> = panes.iter().map(|p| self.pane_command(p)).collect();
        self.mux
            .launch(&commands)
            .await
            .map_err(|e| SupervisorError::PaneLaunchFailed(e.to_string()))?;

        info!(
            panes = panes.len(),
            session = self.mux.session_name(),
            profile = %self.profile.name,
            "swarm started"
        );
        Ok(())
    }

    /// Per-pane session context injection: role, pane id, project paths,
    /// and any `${VAR}` references the profile declares, expanded from
    /// this process's environment.
    fn pane_command(&self, spec: &PaneSpec) -> PaneCommand {
        let mut env = BTreeMap::from([
            ("QSF_ROLE".to_string(), spec.role.as_str().to_string()),
            ("QSF_PANE".to_string(), spec.pane.to_string()),
            (
                "QSF_PROJECT_ROOT".to_string(),
                self.layout.root().display().to_string(),
            ),
            (
                "QSF_LOG_FILE".to_string(),
                self.layout.pane_log_file(spec.pane).display().to_string(),
            ),
        ]);

        for var in self.profile_env_refs() {
            match std::env::var(&var) {
                Ok(value) => {
                    env.insert(var, value);
                }
                Err(_) => warn!(var, "profile references an env var the supervisor does not have"),
            }
        }

        PaneCommand {
            title: format!("{}-{}", spec.role, spec.pane),
            program: self.worker_bin.clone(),
            args: vec![
                "worker".to_string(),
                "--role".to_string(),
                spec.role.as_str().to_string(),
                "--pane".to_string(),
                spec.pane.to_string(),
            ],
            env,
        }
    }

    /// `${VAR}` tokens in the active profile file.
    fn profile_env_refs(&self) -> Vec<String> {
        let mut refs = Vec::new();
        if let Some(var) = &self.profile.data_provider.api_key_env {
            refs.push(var.clone());
        }
        // Scan the raw profile text for further ${VAR} references.
        let pointer_path = self.layout.active_profile_file();
        if let Ok(pointer) = fs::read_to_string(&pointer_path) {
            if let Ok(v) = serde_json::from_str::<serde_json::Value>(&pointer) {
                if let Some(rel) = v.get("path").and_then(|p| p.as_str()) {
                    if let Ok(text) = fs::read_to_string(self.layout.root().join(rel)) {
                        let mut rest = text.as_str();
                        while let Some(start) = rest.find("${") {
                            rest = &rest[start + 2..];
                            if let Some(end) = rest.find('}') {
                                let var = &rest[..end];
                                if !var.is_empty() && !refs.iter().any(|r| r == var) {
                                    refs.push(var.to_string());
                                }
                                rest = &rest[end + 1..];
                            } else {
                                break;
                            }
                        }
                    }
                }
            }
        }
        refs
    }

    fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.layout.patterns_dir(),
            self.layout.checkpoints_dir(),
            self.layout.logs_dir(),
            self.layout.session_summaries_dir(),
            self.layout.hypotheses_output_dir(),
            self.layout.backtests_dir(),
            self.layout.research_logs_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("create dir: {}", dir.display()))?;
        }
        QueueRoot::new(self.layout.queues_dir()).ensure_layout()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stop / pause
    // -----------------------------------------------------------------------

    /// Stop the swarm. Graceful: raise the stop flag, give panes the
    /// configured grace window to finish their in-flight pass, then tear
    /// down. Force: tear down immediately. Either way every claim held by
    /// a stopped pane is reverted before this returns.
    pub async fn stop_all(&self, mode: StopMode) -> Result<()> {
        fs::write(self.layout.stop_signal_file(), b"stop\n")
            .with_context(|| "write stop signal")?;

        if mode == StopMode::Graceful {
            let pane_count = self.pane_layout().len();
            self.mux.interrupt_all(pane_count).await?;

            let deadline = StdDuration::from_secs(self.config.recovery.graceful_stop_secs);
            let poll = StdDuration::from_millis(500);
            let start = std::time::Instant::now();
            while start.elapsed() < deadline {
                if !self.mux.session_alive().await {
                    break;
                }
                tokio::time::sleep(poll).await;
            }
        }

        self.mux.kill().await?;

        // Clean stop: every remaining claim is returned to pending now,
        // not left for the stale-heartbeat rule.
        let queues = QueueRoot::new(self.layout.queues_dir());
        let reverted = revert_stale_claims(&queues, |_| None, Duration::zero(), Utc::now())?;
        if !reverted.is_empty() {
            info!(count = reverted.len(), "reverted claims held at stop");
        }

        SupervisorLock::release(&self.layout.supervisor_lock_file())?;
        info!("swarm stopped");
        Ok(())
    }

    /// Pause: workers idle (heartbeating) between tasks while the flag
    /// exists. In-flight passes finish normally.
    pub fn pause(&self) -> Result<()> {
        fs::write(self.layout.pause_signal_file(), b"pause\n").context("write pause signal")
    }

    pub fn resume(&self) -> Result<()> {
        match fs::remove_file(self.layout.pause_signal_file()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("remove pause signal"),
        }
    }

    /// A supervisor is running iff the lock exists with a live owner.
    pub fn is_running(&self) -> bool {
        SupervisorLock::held_by_live_owner(&self.layout.supervisor_lock_file())
    }

    // -----------------------------------------------------------------------
    // Liveness / recovery
    // -----------------------------------------------------------------------

    /// Per-pane state rows for the control plane.
    pub fn worker_states(&self) -> Result<Vec<WorkerState>> {
        let checkpoints = CheckpointStore::new(self.layout.checkpoints_dir());
        let now = Utc::now();
        let staleness = self.staleness_window();
        let quiet = Duration::seconds((3 * self.config.poll_interval_secs) as i64);

        let mut rows = Vec::new();
        for spec in self.pane_layout() {
            let row = match checkpoints.load(spec.pane)? {
                None => WorkerState {
                    pane: spec.pane,
                    role: spec.role,
                    health: PaneHealth::NeverStarted,
                    heartbeat_age_secs: None,
                    tasks_completed: 0,
                    consecutive_failures: 0,
                    last_error_kind: None,
                    last_claimed_item: None,
                },
                Some(cp) => {
                    let age = now - cp.last_heartbeat;
                    let health = if age > staleness {
                        PaneHealth::Stale
                    } else if age > quiet {
                        PaneHealth::Quiet
                    } else {
                        PaneHealth::Running
                    };
                    WorkerState {
                        pane: spec.pane,
                        role: spec.role,
                        health,
                        heartbeat_age_secs: Some(age.num_seconds()),
                        tasks_completed: cp.tasks_completed,
                        consecutive_failures: cp.consecutive_failures,
                        last_error_kind: cp.last_error_kind,
                        last_claimed_item: cp.last_claimed_item,
                    }
                }
            };
            rows.push(row);
        }
        Ok(rows)
    }

    /// Revert claims whose owner's heartbeat is stale. Idempotent; safe to
    /// run on a schedule and at startup.
    pub fn recover(&self) -> Result<Vec<ItemId>> {
        let queues = QueueRoot::new(self.layout.queues_dir());
        let checkpoints = CheckpointStore::new(self.layout.checkpoints_dir());
        let staleness = self.staleness_window();

        let reverted = revert_stale_claims(
            &queues,
            |pane| checkpoints.heartbeat_of(pane),
            staleness,
            Utc::now(),
        )?;
        Ok(reverted)
    }

    /// 3x the profile's session timeout, per the revert policy.
    fn staleness_window(&self) -> Duration {
        Duration::seconds(
            (self.config.recovery.stale_claim_multiplier as i64)
                * (self.profile.session_timeout_secs as i64),
        )
    }
}
