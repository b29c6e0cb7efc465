//! qsf-supervisor
//!
//! Launches and supervises the swarm: one terminal pane per worker, a
//! lock file guaranteeing a single supervisor per project root, liveness
//! from checkpoint heartbeats, and the recovery pass that returns orphaned
//! claims to their queues.
//!
//! The supervisor coordinates everything through the filesystem; it has no
//! channel to a worker other than signal files and the pane process
//! itself.

mod lock;
mod mux;
mod supervisor;

pub use lock::{LockInfo, SupervisorLock};
pub use mux::{Multiplexer, PaneCommand};
pub use supervisor::{
    PaneHealth, PaneSpec, StopMode, Supervisor, SupervisorError, WorkerState,
};
