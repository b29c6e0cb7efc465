//! `qsf stop [--force]`

use std::path::Path;

use anyhow::{Context, Result};

use qsf_supervisor::{StopMode, Supervisor};

use crate::style;

pub async fn run(root: &Path, force: bool) -> Result<()> {
    let worker_bin = std::env::current_exe().context("locate qsf binary")?;
    let supervisor = Supervisor::open(root, worker_bin)?;

    let mode = if force {
        StopMode::Force
    } else {
        StopMode::Graceful
    };
    supervisor.stop_all(mode).await?;

    println!(
        "{} swarm stopped{}",
        style::badge_pass("ok"),
        if force { " (forced)" } else { "" }
    );
    Ok(())
}
