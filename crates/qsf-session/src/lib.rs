//! qsf-session
//!
//! One session = one continuous period of one worker's activity, bounded
//! by `SESSION_START` / `SESSION_COMPLETE` markers and driven through four
//! states: START -> LOOP -> DISTILL -> COMPLETE.
//!
//! # Invariants
//!
//! - Distillation is mandatory. `SESSION_COMPLETE` is only reachable after
//!   a successful distill; a failed distill reports
//!   `INCOMPLETE_NEEDS_DISTILL` and the supervisor retries before the pane
//!   is considered idle.
//! - Completion is phrase AND files. A model pass that printed the
//!   completion phrase but created no file under the output root is a
//!   failure, retried up to the consecutive-failure threshold.
//! - Ending a session by timeout or budget marks no item failed by itself.

mod controller;
mod summary;
mod verify;

pub use controller::{
    SessionController, SessionEndReason, SessionOutcome, SessionReport, SessionSettings,
    SessionState,
};
pub use summary::write_session_summary;
pub use verify::{check_completion, newer_files_under, CompletionCheck, ModelPassResult};
