//! Queue-layer errors.

use std::path::PathBuf;

use thiserror::Error;

use qsf_schemas::ItemId;

#[derive(Debug, Error)]
pub enum QueueError {
    /// A pushed id already exists in the target queue. The id generator is
    /// the contract; this is a fatal bug, not a retry case.
    #[error("duplicate item id pushed: {0}")]
    DuplicateId(ItemId),

    /// A claimed file disappeared under its exclusive owner.
    #[error("claimed file missing: {0}")]
    MissingClaimed(PathBuf),

    /// An item file did not parse as a queue item envelope.
    #[error("malformed queue item at {path}: {reason}")]
    MalformedItem { path: PathBuf, reason: String },

    #[error("queue io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl QueueError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> QueueError {
        let path = path.into();
        move |source| QueueError::Io { path, source }
    }
}
