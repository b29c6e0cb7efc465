//! The supervisor lock file.
//!
//! Exactly one live supervisor per project root. The lock is NOT removed
//! when the acquiring process exits; it represents a running swarm, and
//! only `stop` releases it. A lock whose recorded pid is dead is stale and
//! may be replaced.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contents of `supervisor.lock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub session_name: String,
}

#[derive(Debug)]
pub struct SupervisorLock {
    path: PathBuf,
}

impl SupervisorLock {
    /// Try to take the lock. `Ok(None)` means another live supervisor owns
    /// it; a stale lock (dead pid) is replaced.
    pub fn acquire(path: &Path, session_name: &str) -> Result<Option<SupervisorLock>> {
        if let Some(existing) = SupervisorLock::read(path)? {
            if pid_alive(existing.pid) {
                return Ok(None);
            }
            // Dead owner: the swarm it described is gone.
            fs::remove_file(path)
                .with_context(|| format!("remove stale supervisor lock: {}", path.display()))?;
        }

        let info = LockInfo {
            pid: std::process::id(),
            started_at: Utc::now(),
            session_name: session_name.to_string(),
        };

        let mut f = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Raced another starter; it wins.
                return Ok(None);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("create supervisor lock: {}", path.display()))
            }
        };
        let json = serde_json::to_string_pretty(&info).context("serialize lock info")?;
        f.write_all(format!("{json}\n").as_bytes())
            .with_context(|| format!("write supervisor lock: {}", path.display()))?;

        Ok(Some(SupervisorLock {
            path: path.to_path_buf(),
        }))
    }

    /// Read the lock without acquiring it.
    pub fn read(path: &Path) -> Result<Option<LockInfo>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read supervisor lock: {}", path.display()))
            }
        };
        let info = serde_json::from_str(&text)
            .with_context(|| format!("parse supervisor lock: {}", path.display()))?;
        Ok(Some(info))
    }

    /// True when a lock exists and its owner is alive.
    pub fn held_by_live_owner(path: &Path) -> bool {
        matches!(SupervisorLock::read(path), Ok(Some(info)) if pid_alive(info.pid))
    }

    /// Release: `stop` calls this after the swarm is down.
    pub fn release(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("remove supervisor lock: {}", path.display()))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Signal 0 probes existence without delivering anything.
fn pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_while_owner_lives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisor.lock");

        let first = SupervisorLock::acquire(&path, "qsf").unwrap();
        assert!(first.is_some());

        // Same process is alive, so a second acquire loses.
        let second = SupervisorLock::acquire(&path, "qsf").unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn stale_lock_with_dead_pid_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisor.lock");

        // Positive but far beyond pid_max on any sane host.
        let info = LockInfo {
            pid: 999_999_999,
            started_at: Utc::now(),
            session_name: "qsf".into(),
        };
        fs::write(&path, serde_json::to_string(&info).unwrap()).unwrap();

        let lock = SupervisorLock::acquire(&path, "qsf").unwrap();
        assert!(lock.is_some(), "dead owner must not block a new supervisor");

        let read_back = SupervisorLock::read(&path).unwrap().unwrap();
        assert_eq!(read_back.pid, std::process::id());
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisor.lock");
        SupervisorLock::acquire(&path, "qsf").unwrap();

        SupervisorLock::release(&path).unwrap();
        SupervisorLock::release(&path).unwrap();
        assert!(!path.exists());
    }
}
