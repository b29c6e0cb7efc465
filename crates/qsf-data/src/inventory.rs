//! Recursive scan of a data directory for `qsf data status`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One data file with the fields the status view renders.
#[derive(Debug, Clone, Serialize)]
pub struct DataFileInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Aggregate inventory for one scanned root.
#[derive(Debug, Clone, Serialize)]
pub struct DataInventory {
    pub root: PathBuf,
    pub files: Vec<DataFileInfo>,
    pub total_bytes: u64,
}

impl DataInventory {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Enumerate data files under `root`, sorted by path. A missing root yields
/// an empty inventory rather than an error: a fresh project has no data
/// yet.
pub fn scan_data_dir(root: &Path) -> Result<DataInventory> {
    let mut files = Vec::new();
    if root.is_dir() {
        walk(root, &mut files)?;
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    let total_bytes = files.iter().map(|f| f.size_bytes).sum();

    Ok(DataInventory {
        root: root.to_path_buf(),
        files,
        total_bytes,
    })
}

fn walk(dir: &Path, out: &mut Vec<DataFileInfo>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read data dir: {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("read data dir entry: {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out)?;
            continue;
        }
        let meta = entry
            .metadata()
            .with_context(|| format!("stat data file: {}", path.display()))?;
        let modified_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        out.push(DataFileInfo {
            path,
            size_bytes: meta.len(),
            modified_at,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_counts_nested_files_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("ES")).unwrap();
        fs::write(dir.path().join("ES/2026-01.csv"), "a,b,c\n1,2,3\n").unwrap();
        fs::write(dir.path().join("manifest.json"), "{}").unwrap();

        let inv = scan_data_dir(dir.path()).unwrap();
        assert_eq!(inv.files.len(), 2);
        assert_eq!(
            inv.total_bytes,
            inv.files.iter().map(|f| f.size_bytes).sum::<u64>()
        );
    }

    #[test]
    fn missing_root_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let inv = scan_data_dir(&dir.path().join("nope")).unwrap();
        assert!(inv.is_empty());
    }
}
