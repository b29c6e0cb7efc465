//! qsf-checkpoint
//!
//! Per-pane crash-recovery records. One JSON file per pane under
//! `checkpoints/`, written atomically after every task, with a heartbeat
//! timestamp the supervisor and queue recovery read for liveness.
//!
//! A worker MAY hold at most one claimed item at any time, so the record
//! tracks a single `last_claimed_item`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qsf_queue::QueueRoot;
use qsf_schemas::{ErrorKind, ItemId, WorkerRole};

/// One pane's session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub pane: u32,
    pub role: WorkerRole,
    pub session_started_at: DateTime<Utc>,
    pub tasks_completed: u32,
    pub files_created: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_claimed_item: Option<ItemId>,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_kind: Option<ErrorKind>,
    pub last_heartbeat: DateTime<Utc>,
}

impl Checkpoint {
    /// A fresh record for a session starting now.
    pub fn fresh(pane: u32, role: WorkerRole, now: DateTime<Utc>) -> Checkpoint {
        Checkpoint {
            pane,
            role,
            session_started_at: now,
            tasks_completed: 0,
            files_created: 0,
            last_claimed_item: None,
            consecutive_failures: 0,
            last_error_kind: None,
            last_heartbeat: now,
        }
    }
}

/// What startup reconciliation decided about a recorded claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeAction {
    /// No claim recorded; start clean.
    Fresh,
    /// Claim recorded and the claimed file exists: resume that item.
    Resume(ItemId),
    /// Claim recorded but no claimed file anywhere: the record was stale
    /// and has been cleared.
    ClearedStale(ItemId),
}

/// Store over the `checkpoints/` directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> CheckpointStore {
        CheckpointStore { dir: dir.into() }
    }

    pub fn path(&self, pane: u32) -> PathBuf {
        self.dir.join(format!("pane-{pane}.json"))
    }

    /// Atomic write via temp + rename.
    pub fn save(&self, cp: &Checkpoint) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create checkpoints dir: {}", self.dir.display()))?;

        let path = self.path(cp.pane);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(cp).context("serialize checkpoint")?;
        fs::write(&tmp, format!("{json}\n"))
            .with_context(|| format!("write checkpoint temp: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("publish checkpoint: {}", path.display()))?;
        Ok(())
    }

    /// `Ok(None)` when the pane has never checkpointed.
    pub fn load(&self, pane: u32) -> Result<Option<Checkpoint>> {
        let path = self.path(pane);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read checkpoint: {}", path.display()))
            }
        };
        let cp = serde_json::from_str(&text)
            .with_context(|| format!("parse checkpoint: {}", path.display()))?;
        Ok(Some(cp))
    }

    /// Refresh `last_heartbeat` only. A pane with no record yet is a bug in
    /// the caller (sessions always save a fresh checkpoint first), so this
    /// errors rather than inventing one.
    pub fn heartbeat(&self, pane: u32) -> Result<()> {
        let mut cp = self
            .load(pane)?
            .with_context(|| format!("heartbeat for pane {pane} with no checkpoint"))?;
        cp.last_heartbeat = Utc::now();
        self.save(&cp)
    }

    /// Last heartbeat for a pane, if it has ever checkpointed. The closure
    /// shape queue recovery wants.
    pub fn heartbeat_of(&self, pane: u32) -> Option<DateTime<Utc>> {
        self.load(pane).ok().flatten().map(|cp| cp.last_heartbeat)
    }

    /// Startup reconciliation: if a claim is recorded but no matching
    /// claimed file exists in any queue, the stale claim is cleared from
    /// the record; if both exist, the worker resumes on that item.
    pub fn reconcile(&self, pane: u32, queues: &QueueRoot) -> Result<ResumeAction> {
        let Some(mut cp) = self.load(pane)? else {
            return Ok(ResumeAction::Fresh);
        };
        let Some(id) = cp.last_claimed_item.clone() else {
            return Ok(ResumeAction::Fresh);
        };

        match queues.find_claimed(&id)? {
            Some(_) => Ok(ResumeAction::Resume(id)),
            None => {
                cp.last_claimed_item = None;
                self.save(&cp)?;
                Ok(ResumeAction::ClearedStale(id))
            }
        }
    }

    /// All checkpoints on disk, ordered by pane.
    pub fn list(&self) -> Result<Vec<Checkpoint>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read checkpoints dir: {}", self.dir.display()))
            }
        };

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.context("read checkpoints dir entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(pane) = name
                .strip_prefix("pane-")
                .and_then(|s| s.strip_suffix(".json"))
                .and_then(|s| s.parse().ok())
            else {
                continue;
            };
            if let Some(cp) = self.load(pane)? {
                out.push(cp);
            }
        }
        out.sort_by_key(|cp| cp.pane);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints"));

        let mut cp = Checkpoint::fresh(2, WorkerRole::Backtester, Utc::now());
        cp.tasks_completed = 7;
        store.save(&cp).unwrap();

        let back = store.load(2).unwrap().unwrap();
        assert_eq!(back, cp);
        assert!(store.load(3).unwrap().is_none());
    }

    #[test]
    fn heartbeat_advances_only_the_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints"));

        let cp = Checkpoint::fresh(1, WorkerRole::Researcher, Utc::now());
        store.save(&cp).unwrap();
        store.heartbeat(1).unwrap();

        let back = store.load(1).unwrap().unwrap();
        assert!(back.last_heartbeat >= cp.last_heartbeat);
        assert_eq!(back.tasks_completed, 0);
    }
}
