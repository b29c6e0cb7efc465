//! The project filesystem layout: every path the substrate reads or
//! writes, derived from one project root. Pure path construction; callers
//! create directories.
//!
//! `queues/`, `output/`, and `checkpoints/` must live on one filesystem:
//! every observable transition is a same-device rename.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> ProjectLayout {
        ProjectLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn active_profile_file(&self) -> PathBuf {
        self.root.join("active-profile.json")
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    pub fn patterns_dir(&self) -> PathBuf {
        self.root.join("patterns")
    }

    pub fn queues_dir(&self) -> PathBuf {
        self.root.join("queues")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn strategies_dir(&self) -> PathBuf {
        self.root.join("output").join("strategies")
    }

    pub fn backtests_dir(&self) -> PathBuf {
        self.root.join("output").join("backtests")
    }

    pub fn research_logs_dir(&self) -> PathBuf {
        self.root.join("output").join("research-logs")
    }

    pub fn hypotheses_output_dir(&self) -> PathBuf {
        self.root.join("output").join("hypotheses")
    }

    pub fn session_summaries_dir(&self) -> PathBuf {
        self.root.join("session-summaries")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn pane_log_file(&self, pane: u32) -> PathBuf {
        self.logs_dir().join(format!("pane-{pane}.log"))
    }

    pub fn supervisor_lock_file(&self) -> PathBuf {
        self.root.join("supervisor.lock")
    }

    pub fn cost_tracker_file(&self) -> PathBuf {
        self.root.join("cost-tracker.json")
    }

    /// Stop flag checked by workers between iterations.
    pub fn stop_signal_file(&self) -> PathBuf {
        self.root.join("stop.signal")
    }

    /// Pause flag: workers idle (heartbeating) while it exists.
    pub fn pause_signal_file(&self) -> PathBuf {
        self.root.join("pause.signal")
    }
}
