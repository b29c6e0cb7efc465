//! qsf-patterns
//!
//! Read/append interface over the cross-session markdown knowledge files.
//!
//! # Invariants
//!
//! - The store is append-only. It never deletes, rewrites, or reorders
//!   entries; history is the product.
//! - Concurrent appenders are serialized by a per-category lock file. The
//!   loser retries after a bounded random wait.
//! - Appending the same entry twice creates two entries. No de-dup is
//!   promised.
//! - Reads are lock-free; readers accept a slightly stale tail.

mod category;
mod entry;
mod store;

pub use category::PatternCategory;
pub use entry::{EntryKind, PatternEntry};
pub use store::{PatternStore, ENTRY_MARKER};
