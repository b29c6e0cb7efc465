//! qsf-worker
//!
//! The per-worker mission loop. One process per pane, one role per
//! process, strictly one task at a time. The loop claims from its role's
//! input queues, invokes the model boundary, verifies completion (phrase
//! plus files), routes the output, updates its checkpoint, and heartbeats.
//!
//! All inter-worker coordination is on the filesystem; nothing in this
//! crate talks to another worker directly.

mod context;
mod cost_tracker;
mod invoker;
mod notifier;
mod routing;
mod worker_loop;

pub use context::SessionContext;
pub use cost_tracker::CostTracker;
pub use invoker::{
    DistillRequest, InvokerError, ModelInvoker, PatternDraft, ProcessInvoker, TaskRequest,
    TaskTranscript,
};
pub use notifier::{LogNotifier, Notifier, NullNotifier};
pub use routing::{load_backtest_summary, load_optimization_summary};
pub use worker_loop::{WorkerHarness, WorkerLoop};
