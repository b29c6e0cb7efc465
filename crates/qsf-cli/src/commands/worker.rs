//! `qsf worker --role <role> --pane <n>` (hidden)
//!
//! The process the supervisor runs inside each pane. Sets up file-backed
//! tracing, wires SIGINT to the stop path, and runs the mission loop.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use qsf_schemas::{ProjectLayout, WorkerRole};
use qsf_worker::{LogNotifier, ProcessInvoker, WorkerHarness, WorkerLoop};

pub async fn run(root: &Path, role: &str, pane: u32, verbose: bool) -> Result<()> {
    let role: WorkerRole = role
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}; expected researcher|converter|backtester|optimizer"))?;

    init_pane_tracing(root, pane, verbose)?;
    info!(pane, role = %role, "worker pane starting");

    let harness = WorkerHarness::open(root, pane, role)?;
    let invoker = ProcessInvoker::new(
        harness.config.model.command.clone(),
        harness.config.model.args.clone(),
        harness.layout.root().to_path_buf(),
    );
    let mut worker = WorkerLoop::new(harness, invoker, LogNotifier);

    // SIGINT from a graceful stop raises the same flag the stop file sets.
    let stop_file = ProjectLayout::new(root).stop_signal_file();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = std::fs::write(&stop_file, b"stop\n");
        }
    });

    worker.run_forever().await
}

/// Workers log to `logs/pane-<n>.log`; stdout stays clean for markers.
fn init_pane_tracing(root: &Path, pane: u32, verbose: bool) -> Result<()> {
    let layout = ProjectLayout::new(root);
    std::fs::create_dir_all(layout.logs_dir()).context("create logs dir")?;

    let path = layout.pane_log_file(pane);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open pane log: {}", path.display()))?;

    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_ansi(false)
        .with_writer(move || file.try_clone().expect("clone pane log handle"))
        .init();
    Ok(())
}
