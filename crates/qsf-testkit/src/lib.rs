//! qsf-testkit
//!
//! Deterministic offline composition of the real engines for scenario
//! tests: a scaffolded project root in a tempdir, and a scripted model
//! invoker that replays marker lines and creates files on cue. No network,
//! no real model, no tmux.

mod project;
mod scripted;

pub use project::TestProject;
pub use scripted::{ScriptedInvoker, ScriptedTask};
