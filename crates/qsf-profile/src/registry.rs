//! Loading, listing and switching profiles.
//!
//! # Invariants
//!
//! - Profiles are read-only after load. The registry hands out `&Profile`;
//!   nothing mutates a loaded profile.
//! - Switching the active profile requires no running workers: the switch
//!   fails while `supervisor.lock` exists.
//! - `active-profile.json` is rewritten atomically (temp + rename), so a
//!   crashed switch leaves either the old pointer or the new one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{MarketType, Profile};

pub const ACTIVE_POINTER_FILE: &str = "active-profile.json";
pub const PROFILES_DIR: &str = "profiles";
pub const SUPERVISOR_LOCK_FILE: &str = "supervisor.lock";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile file missing: {0}")]
    Missing(PathBuf),
    #[error("profile malformed: {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("unknown market type: {0}")]
    UnknownMarketType(String),
    #[error("cannot switch profiles while the swarm is running")]
    SwitchWhileRunning,
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Contents of `active-profile.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePointer {
    pub active: String,
    pub path: String,
}

/// A profile listing entry for the control plane.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub market_type: MarketType,
    pub path: PathBuf,
    pub is_active: bool,
}

/// The loaded registry: the active profile plus where it came from.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    root: PathBuf,
    active_name: String,
    profile: Profile,
}

impl ProfileRegistry {
    /// Load the active profile under `root`.
    pub fn load(root: &Path) -> Result<ProfileRegistry, ProfileError> {
        let pointer_path = root.join(ACTIVE_POINTER_FILE);
        let pointer: ActivePointer = read_json(&pointer_path)?;

        let profile_path = root.join(&pointer.path);
        let profile = load_profile_file(&profile_path)?;

        Ok(ProfileRegistry {
            root: root.to_path_buf(),
            active_name: pointer.active,
            profile,
        })
    }

    pub fn active(&self) -> &Profile {
        &self.profile
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Switch the active profile to `name`. Refused while the supervisor
    /// lock exists.
    pub fn switch(root: &Path, name: &str) -> Result<(), ProfileError> {
        if root.join(SUPERVISOR_LOCK_FILE).exists() {
            return Err(ProfileError::SwitchWhileRunning);
        }

        let rel = format!("{PROFILES_DIR}/{name}.json");
        let profile_path = root.join(&rel);
        // Validate before committing the pointer.
        load_profile_file(&profile_path)?;

        let pointer = ActivePointer {
            active: name.to_string(),
            path: rel,
        };
        write_json_atomic(&root.join(ACTIVE_POINTER_FILE), &pointer)
    }

    /// All profiles under `profiles/`, with the active one flagged.
    pub fn list(root: &Path) -> Result<Vec<ProfileSummary>, ProfileError> {
        let active = ProfileRegistry::load(root)
            .map(|r| r.active_name)
            .unwrap_or_default();

        let dir = root.join(PROFILES_DIR);
        let entries = fs::read_dir(&dir).map_err(|source| ProfileError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProfileError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let profile = load_profile_file(&path)?;
            out.push(ProfileSummary {
                is_active: profile.name == active,
                name: profile.name,
                market_type: profile.market_type,
                path,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

/// Parse one profile file, reporting unknown market types precisely.
fn load_profile_file(path: &Path) -> Result<Profile, ProfileError> {
    let raw: Value = read_json(path)?;

    // Surface the one tag error the contract names before full decode.
    if let Some(mt) = raw.get("marketType").and_then(Value::as_str) {
        if !matches!(mt, "futures" | "crypto") {
            return Err(ProfileError::UnknownMarketType(mt.to_string()));
        }
    }

    serde_json::from_value(raw).map_err(|e| ProfileError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProfileError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProfileError::Missing(path.to_path_buf()))
        }
        Err(source) => {
            return Err(ProfileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|e| ProfileError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ProfileError> {
    let io_err = |source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(value).expect("pointer serialization must not fail");
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, format!("{json}\n")).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
