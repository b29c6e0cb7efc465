//! `qsf strategies [--filter ...] [--json]`

use std::path::Path;

use anyhow::{bail, Result};

use qsf_artifacts::{Bucket, BundleInfo, StrategiesRoot};
use qsf_profile::ProfileRegistry;
use qsf_schemas::ProjectLayout;

use crate::style;

pub fn run(root: &Path, filter: Option<&str>, json: bool) -> Result<()> {
    let layout = ProjectLayout::new(root);
    let profile = ProfileRegistry::load(root)?.active().clone();
    let strategies = StrategiesRoot::new(layout.strategies_dir());

    let buckets: Vec<Bucket> = match filter {
        None => vec![
            Bucket::Validated(profile.validated_dir.clone()),
            Bucket::Good,
            Bucket::UnderReview,
            Bucket::Rejected,
        ],
        Some("good") => vec![Bucket::Good],
        Some("review") => vec![Bucket::UnderReview],
        Some("rejected") => vec![Bucket::Rejected],
        Some("validated") => vec![Bucket::Validated(profile.validated_dir.clone())],
        Some(other) => bail!("unknown filter: {other} (good|review|rejected|validated)"),
    };

    let mut bundles: Vec<BundleInfo> = Vec::new();
    for bucket in &buckets {
        bundles.extend(strategies.list_bucket(bucket)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    if bundles.is_empty() {
        println!("{}", style::dim("no strategies in the selected buckets"));
        return Ok(());
    }

    println!("{}", style::divider());
    for b in &bundles {
        let badge = match b.category.as_str() {
            "validated" => style::badge_pass("validated"),
            "good" => style::badge_pass("good"),
            "review" => style::badge_warn("review"),
            _ => style::badge_fail("rejected"),
        };
        println!("  {badge} {:<24} {}", b.name, style::dim(&b.path.display().to_string()));
    }
    println!("{}", style::divider());
    println!("  {} strategies", bundles.len());
    Ok(())
}
