//! qsf entry point.
//!
//! This file is intentionally thin: global flags, tracing setup, and
//! dispatch. Each command lives in `commands/`; shared rendering lives in
//! `style.rs` and `snapshot.rs`.

mod commands;
mod dashboard;
mod snapshot;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qsf")]
#[command(about = "Quant Strategy Factory control plane", long_about = None)]
struct Cli {
    /// Project root containing config.json (defaults to the current dir).
    #[arg(long, global = true, default_value = ".")]
    config: PathBuf,

    /// Lower the log filter to debug.
    #[arg(long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the swarm, or a single role's panes.
    Start {
        /// researcher | converter | backtester | optimizer
        role: Option<String>,
    },

    /// Stop the swarm.
    Stop {
        /// Kill immediately instead of draining gracefully.
        #[arg(long)]
        force: bool,
    },

    /// Dashboard (default), one-shot snapshot, or JSON.
    Status {
        /// Print one snapshot and exit.
        #[arg(long)]
        once: bool,
        /// Print the snapshot as JSON (implies --once).
        #[arg(long)]
        json: bool,
    },

    /// Browse strategy artifact buckets.
    Strategies {
        /// good | review | rejected | validated
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Run the health check suite.
    Health {
        /// system | project | data | runtime
        #[arg(long)]
        category: Option<String>,
    },

    /// Show config, list profiles, or switch the active profile.
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCmd>,
    },

    /// Data inventory commands.
    Data {
        #[command(subcommand)]
        cmd: DataCmd,
    },

    /// Run one worker pane (launched by the supervisor inside a pane).
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        role: String,
        #[arg(long)]
        pane: u32,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// List available profiles.
    Profiles,
    /// Switch the active profile (requires no running workers).
    Switch { name: String },
}

#[derive(Subcommand)]
enum DataCmd {
    /// Enumerate sample/historical data files with sizes and mtimes.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let is_worker = matches!(cli.cmd, Commands::Worker { .. });
    if !is_worker {
        init_tracing(cli.verbose);
    }

    let root = cli.config.clone();
    let result = match cli.cmd {
        Commands::Start { role } => commands::start::run(&root, role.as_deref()).await,
        Commands::Stop { force } => commands::stop::run(&root, force).await,
        Commands::Status { once, json } => commands::status::run(&root, once, json).await,
        Commands::Strategies { filter, json } => {
            commands::strategies::run(&root, filter.as_deref(), json)
        }
        Commands::Health { category } => {
            return commands::health::run(&root, category.as_deref()).await;
        }
        Commands::Config { cmd } => match cmd {
            None => commands::config::show(&root),
            Some(ConfigCmd::Profiles) => commands::config::profiles(&root),
            Some(ConfigCmd::Switch { name }) => commands::config::switch(&root, &name),
        },
        Commands::Data { cmd } => match cmd {
            DataCmd::Status => commands::data::status(&root),
        },
        Commands::Worker { role, pane } => {
            commands::worker::run(&root, &role, pane, cli.verbose).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style::badge_fail("error"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
