//! `qsf start [role]`

use std::path::Path;

use anyhow::{Context, Result};

use qsf_schemas::WorkerRole;
use qsf_supervisor::Supervisor;

use crate::style;

pub async fn run(root: &Path, role: Option<&str>) -> Result<()> {
    let worker_bin = std::env::current_exe().context("locate qsf binary")?;
    let supervisor = Supervisor::open(root, worker_bin)?;

    match role {
        None => {
            supervisor.start_all().await?;
            println!(
                "{} swarm started ({} panes, profile {})",
                style::badge_pass("ok"),
                supervisor.pane_layout().len(),
                supervisor.profile().name
            );
        }
        Some(role) => {
            let role: WorkerRole = role
                .parse()
                .map_err(|e| anyhow::anyhow!("{e}; expected researcher|converter|backtester|optimizer"))?;
            supervisor.start_worker(role).await?;
            println!("{} {role} panes started", style::badge_pass("ok"));
        }
    }
    Ok(())
}
