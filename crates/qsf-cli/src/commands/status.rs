//! `qsf status [--once] [--json]`

use std::path::Path;

use anyhow::Result;

use crate::dashboard;
use crate::snapshot::{self, FactorySnapshot};
use crate::style;

pub async fn run(root: &Path, once: bool, json: bool) -> Result<()> {
    if json {
        let snap = snapshot::capture(root)?;
        println!("{}", serde_json::to_string_pretty(&snap)?);
        return Ok(());
    }
    if once {
        let snap = snapshot::capture(root)?;
        print_snapshot(&snap);
        return Ok(());
    }
    dashboard::run(root).await
}

pub fn print_snapshot(snap: &FactorySnapshot) {
    println!("{}", style::divider());
    println!(
        "{} {}  {} {}  {} {}",
        style::label("profile"),
        style::value(&snap.active_profile),
        style::label("mode"),
        style::value(&snap.mode),
        style::label("session"),
        if snap.session_active {
            style::badge_pass("active")
        } else {
            style::dim("inactive")
        },
    );
    println!(
        "{} {}",
        style::label("config"),
        style::dim(&snap.config_hash[..16.min(snap.config_hash.len())])
    );
    println!("{}", style::divider());

    println!("{}", style::label("workers"));
    for w in &snap.workers {
        let heartbeat = w
            .heartbeat_age_secs
            .map(style::human_age)
            .unwrap_or_else(|| "never".to_string());
        let error = w
            .last_error_kind
            .as_deref()
            .map(|k| format!("  last error: {k}"))
            .unwrap_or_default();
        println!(
            "  pane {:>2} {:<11} {:<22} tasks {:>3}  fails {:>2}  hb {}{}",
            w.pane,
            w.role,
            health_badge(&w.health),
            w.tasks_completed,
            w.consecutive_failures,
            heartbeat,
            error,
        );
    }

    println!("{}", style::label("queues"));
    for q in &snap.queues {
        println!(
            "  {:<12} {:>4} pending  {:>3} in progress",
            q.name, q.pending, q.in_progress
        );
    }
    println!(
        "  {:<12} {:>4} completed  {:>3} failed",
        "archive", snap.archived_completed, snap.archived_failed
    );

    println!("{}", style::label("strategies"));
    for b in &snap.buckets {
        println!("  {:<18} {:>4}", b.name, b.count);
    }

    println!(
        "{} ${:.2}",
        style::label("lifetime est. cost"),
        snap.lifetime_cost_usd
    );
    println!("{}", style::divider());
}

fn health_badge(health: &str) -> String {
    match health {
        "running" => style::badge_pass("running"),
        "quiet" => style::badge_warn("quiet"),
        "stale" => style::badge_fail("stale"),
        _ => style::dim("[idle]"),
    }
}
