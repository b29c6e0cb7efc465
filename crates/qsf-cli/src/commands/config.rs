//! `qsf config [profiles|switch <name>]`

use std::path::Path;

use anyhow::Result;

use qsf_config::load_layered_json;
use qsf_profile::ProfileRegistry;
use qsf_schemas::ProjectLayout;

use crate::style;

pub fn show(root: &Path) -> Result<()> {
    let layout = ProjectLayout::new(root);
    let loaded = load_layered_json(&[&layout.config_file()])?;
    let factory = loaded.factory()?;
    let registry = ProfileRegistry::load(root)?;
    let profile = registry.active();

    println!("{}", style::divider());
    println!("{}", style::kv("config hash", &loaded.config_hash));
    println!("{}", style::kv("active profile", registry.active_name()));
    println!("{}", style::kv("market", profile.market_type.as_str()));
    println!("{}", style::kv("validated bucket", &profile.validated_dir));
    println!(
        "{}",
        style::kv(
            "workers",
            &format!(
                "researcher={} converter={} backtester={} optimizer={}",
                factory.workers.researcher,
                factory.workers.converter,
                factory.workers.backtester,
                factory.workers.optimizer
            )
        )
    );
    println!(
        "{}",
        style::kv(
            "recovery",
            &format!(
                "maxConsecutiveFailures={} staleClaimMultiplier={} gracefulStopSecs={}",
                factory.recovery.max_consecutive_failures,
                factory.recovery.stale_claim_multiplier,
                factory.recovery.graceful_stop_secs
            )
        )
    );
    println!(
        "{}",
        style::kv(
            "budget",
            &format!(
                "capUsd={} estPerTaskUsd={}",
                profile.budget_cap_usd, factory.budget.estimated_cost_per_task_usd
            )
        )
    );
    println!("{}", style::kv("model command", &factory.model.command));
    println!("{}", style::divider());
    Ok(())
}

pub fn profiles(root: &Path) -> Result<()> {
    let list = ProfileRegistry::list(root)?;
    for p in list {
        let marker = if p.is_active {
            style::badge_pass("active")
        } else {
            "        ".to_string()
        };
        println!(
            "  {marker} {:<20} {:<8} {}",
            p.name,
            p.market_type.as_str(),
            style::dim(&p.path.display().to_string())
        );
    }
    Ok(())
}

pub fn switch(root: &Path, name: &str) -> Result<()> {
    ProfileRegistry::switch(root, name)?;
    println!("{} active profile is now {name}", style::badge_pass("ok"));
    Ok(())
}
