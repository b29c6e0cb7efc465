//! Routing buckets under `output/strategies/` and the reason file for
//! rejected candidates.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use qsf_backtest::ComplianceReport;
use qsf_gates::{GateDecision, GateReport};

use crate::bundle::BundleWriter;

/// A routing bucket. The validated bucket's directory name comes from the
/// active profile (`prop_firm_ready` for futures, `exchange_validated` for
/// crypto).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Good,
    UnderReview,
    Rejected,
    Validated(String),
}

impl Bucket {
    pub fn dir_name(&self) -> &str {
        match self {
            Bucket::Good => "good",
            Bucket::UnderReview => "under_review",
            Bucket::Rejected => "rejected",
            Bucket::Validated(dir) => dir,
        }
    }

    /// Category label used by `strategies --json`.
    pub fn category(&self) -> &str {
        match self {
            Bucket::Good => "good",
            Bucket::UnderReview => "review",
            Bucket::Rejected => "rejected",
            Bucket::Validated(_) => "validated",
        }
    }
}

/// Decide the bucket for a gate outcome. The compliance verdict only
/// matters for promotable candidates: a promote with failed compliance is
/// a reject, not a review.
pub fn bucket_for(
    decision: GateDecision,
    compliance_passed: Option<bool>,
    validated_dir: &str,
) -> Bucket {
    match decision {
        GateDecision::Reject => Bucket::Rejected,
        GateDecision::UnderReview => Bucket::UnderReview,
        GateDecision::Promote => match compliance_passed {
            Some(true) => Bucket::Validated(validated_dir.to_string()),
            Some(false) => Bucket::Rejected,
            // Backtester stage has no compliance verdict yet; a promotable
            // candidate moves on as "good" raw material for the optimizer.
            None => Bucket::Good,
        },
    }
}

/// One bundle row for the control plane.
#[derive(Debug, Clone, Serialize)]
pub struct BundleInfo {
    pub name: String,
    pub category: String,
    pub path: PathBuf,
}

/// Handle on `output/strategies/`.
#[derive(Debug, Clone)]
pub struct StrategiesRoot {
    root: PathBuf,
}

impl StrategiesRoot {
    pub fn new(root: impl Into<PathBuf>) -> StrategiesRoot {
        StrategiesRoot { root: root.into() }
    }

    pub fn bucket_dir(&self, bucket: &Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    /// Create the fixed buckets plus the profile's validated bucket.
    pub fn ensure_layout(&self, validated_dir: &str) -> Result<()> {
        for bucket in [
            Bucket::Good,
            Bucket::UnderReview,
            Bucket::Rejected,
            Bucket::Validated(validated_dir.to_string()),
        ] {
            let dir = self.bucket_dir(&bucket);
            fs::create_dir_all(&dir)
                .with_context(|| format!("create bucket dir: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Open a staging writer for `strategy_id` in `bucket`.
    pub fn stage(&self, bucket: &Bucket, strategy_id: &str) -> Result<BundleWriter> {
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create bucket dir: {}", dir.display()))?;
        BundleWriter::stage(&dir, strategy_id)
    }

    /// Published bundles in one bucket, sorted by name. Staging directories
    /// are invisible to readers.
    pub fn list_bucket(&self, bucket: &Bucket) -> Result<Vec<BundleInfo>> {
        let dir = self.bucket_dir(bucket);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read bucket dir: {}", dir.display()))
            }
        };

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("read bucket entry: {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !entry.path().is_dir() || name.starts_with('.') {
                continue;
            }
            out.push(BundleInfo {
                name,
                category: bucket.category().to_string(),
                path: entry.path(),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

/// Render `reason.md` for a rejected or under-review candidate: the
/// violated thresholds, and the compliance verdict when one was run.
pub fn write_reason_file(
    writer: &BundleWriter,
    gate: &GateReport,
    compliance: Option<&ComplianceReport>,
) -> Result<()> {
    let mut text = format!(
        "# Routing reason\n\nRecorded: {}\n\n## Gate violations\n",
        Utc::now().format("%+")
    );
    if gate.violations.is_empty() {
        text.push_str("- none\n");
    }
    for v in &gate.violations {
        text.push_str(&format!(
            "- {} (observed {:.4}, limit {:.4})\n",
            v.message, v.observed, v.limit
        ));
    }

    if let Some(c) = compliance {
        text.push_str(&format!(
            "\n## Compliance ({})\n- passed: {}\n",
            c.model, c.passed
        ));
        if let Some(v) = &c.first_violation {
            text.push_str(&format!(
                "- first offending bar: ts={} rule={} observed={:.4} limit={:.4}\n",
                v.ts, v.rule, v.observed, v.limit
            ));
        }
        for firm in &c.firms {
            match &firm.reason {
                Some(reason) => text.push_str(&format!("- {}: FAIL ({reason})\n", firm.firm)),
                None => text.push_str(&format!("- {}: pass\n", firm.firm)),
            }
        }
    }

    writer.write_file("reason.md", text.as_bytes())
}
