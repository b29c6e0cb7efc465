//! Staged bundle writes and the six-file invariant.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use qsf_backtest::{BacktestSummary, ComplianceReport};

pub const FILE_STRATEGY_CODE: &str = "strategy.py";
pub const FILE_BACKTEST: &str = "backtest.json";
pub const FILE_OPTIMIZATION: &str = "optimization.json";
pub const FILE_BASE_HIT: &str = "base_hit.json";
pub const FILE_COMPLIANCE: &str = "compliance.json";
pub const FILE_README: &str = "README.md";

/// The canonical bundle contents. A bundle in the validated bucket MUST
/// contain all six, each non-empty.
pub const BUNDLE_FILES: [&str; 6] = [
    FILE_STRATEGY_CODE,
    FILE_BACKTEST,
    FILE_OPTIMIZATION,
    FILE_BASE_HIT,
    FILE_COMPLIANCE,
    FILE_README,
];

/// Writes one bundle into a staging directory, then publishes it with a
/// single rename. Dropping an unpublished writer leaves the staging
/// directory behind for inspection; `abort` removes it.
pub struct BundleWriter {
    strategy_id: String,
    staging_dir: PathBuf,
    final_dir: PathBuf,
}

impl BundleWriter {
    /// Open a staging area for `strategy_id` inside `bucket_dir`.
    pub fn stage(bucket_dir: &Path, strategy_id: &str) -> Result<BundleWriter> {
        let staging_dir =
            bucket_dir.join(format!(".staging-{}-{}", strategy_id, std::process::id()));
        let final_dir = bucket_dir.join(strategy_id);

        fs::create_dir_all(&staging_dir)
            .with_context(|| format!("create staging dir: {}", staging_dir.display()))?;

        Ok(BundleWriter {
            strategy_id: strategy_id.to_string(),
            staging_dir,
            final_dir,
        })
    }

    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    /// Atomic per-file write inside the staging directory.
    pub fn write_file(&self, name: &str, contents: &[u8]) -> Result<()> {
        let target = self.staging_dir.join(name);
        let tmp = self.staging_dir.join(format!(".tmp-{name}"));
        fs::write(&tmp, contents)
            .with_context(|| format!("write bundle file: {}", tmp.display()))?;
        fs::rename(&tmp, &target)
            .with_context(|| format!("publish bundle file: {}", target.display()))?;
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("serialize bundle file {name}"))?;
        self.write_file(name, format!("{json}\n").as_bytes())
    }

    /// Publish the bundle: one rename from the staging name to the final
    /// name. Bundles are written at most once per strategy id per bucket;
    /// an existing target is an integrity error, not an overwrite.
    pub fn publish(self) -> Result<PathBuf> {
        if self.final_dir.exists() {
            let _ = fs::remove_dir_all(&self.staging_dir);
            bail!(
                "bundle already published: {} (strategy ids are write-once per bucket)",
                self.final_dir.display()
            );
        }
        fs::rename(&self.staging_dir, &self.final_dir).with_context(|| {
            format!(
                "publish bundle {} -> {}",
                self.staging_dir.display(),
                self.final_dir.display()
            )
        })?;
        Ok(self.final_dir)
    }

    /// Drop the staging directory without publishing.
    pub fn abort(self) -> Result<()> {
        fs::remove_dir_all(&self.staging_dir)
            .with_context(|| format!("remove staging dir: {}", self.staging_dir.display()))
    }
}

/// Check the six-file invariant on a published bundle, plus the internal
/// consistency a validated bundle must satisfy: costs present in the
/// backtest JSON, and a compliance report that actually passed with
/// `firms_passed >= min_passing` for prop-firm profiles.
///
/// Returns the list of problems; empty means the bundle is sound.
pub fn verify_bundle(dir: &Path, expect_validated: bool) -> Result<Vec<String>> {
    let mut problems = Vec::new();

    for name in BUNDLE_FILES {
        let path = dir.join(name);
        match fs::metadata(&path) {
            Ok(meta) if meta.len() == 0 => problems.push(format!("{name} is empty")),
            Ok(_) => {}
            Err(_) => problems.push(format!("{name} is missing")),
        }
    }

    if !expect_validated || !problems.is_empty() {
        return Ok(problems);
    }

    let backtest: BacktestSummary = read_json(&dir.join(FILE_BACKTEST))
        .with_context(|| format!("parse {FILE_BACKTEST} in {}", dir.display()))?;
    match &backtest.costs {
        None => problems.push("backtest.json has no costs block".to_string()),
        Some(c) if c.is_costless() => {
            problems.push("backtest.json costs have zero commission and slippage".to_string())
        }
        Some(_) => {}
    }

    let compliance: ComplianceReport = read_json(&dir.join(FILE_COMPLIANCE))
        .with_context(|| format!("parse {FILE_COMPLIANCE} in {}", dir.display()))?;
    if !compliance.passed {
        problems.push("compliance.json did not pass".to_string());
    }
    if compliance.model == "prop-firm" && compliance.firms_passed < compliance.min_passing {
        problems.push(format!(
            "compliance.json firms_passed {} below min_passing {}",
            compliance.firms_passed, compliance.min_passing
        ));
    }

    Ok(problems)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}
