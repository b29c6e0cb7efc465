//! Exclusive ownership of a claimed item and its terminal transitions.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use qsf_schemas::{ErrorKind, ItemError, ItemStatus, QueueItem, QueueName};

use crate::error::QueueError;
use crate::queue::{rewrite_in_place, QueueRoot};
use crate::retry::retry_io;

/// A claimed item, owned exclusively by the claiming pane until one of the
/// terminal transitions consumes it. Dropping a `ClaimedItem` without a
/// transition leaves the `.claimed-*` file on disk for recovery, exactly
/// the crash-holding-a-claim picture.
#[derive(Debug)]
pub struct ClaimedItem {
    root: QueueRoot,
    queue: QueueName,
    claimed_path: PathBuf,
    item: QueueItem,
}

impl ClaimedItem {
    pub(crate) fn new(
        root: QueueRoot,
        queue: QueueName,
        claimed_path: PathBuf,
        item: QueueItem,
    ) -> ClaimedItem {
        ClaimedItem {
            root,
            queue,
            claimed_path,
            item,
        }
    }

    pub fn item(&self) -> &QueueItem {
        &self.item
    }

    pub fn queue(&self) -> QueueName {
        self.queue
    }

    /// Move to `completed/{id}.json`, stripping the claim suffix. The
    /// payload bytes are preserved; only the status fields change.
    pub fn complete(mut self) -> Result<PathBuf, QueueError> {
        self.item.status = ItemStatus::Completed;
        self.transition_into(QueueName::Completed)
    }

    /// Move to `failed/{id}.json`, appending an `error` field.
    pub fn fail(mut self, kind: ErrorKind, message: impl Into<String>) -> Result<PathBuf, QueueError> {
        self.item.status = ItemStatus::Failed;
        self.item.error = Some(ItemError {
            kind,
            message: message.into(),
        });
        self.transition_into(QueueName::Failed)
    }

    /// Return the item to `pending` in its original queue (clean-stop path;
    /// observable downstream as one retry).
    pub fn revert(mut self) -> Result<(), QueueError> {
        self.item.status = ItemStatus::Pending;
        self.item.claimed_by = None;
        self.item.claimed_at = None;

        if !self.claimed_path.exists() {
            return Err(QueueError::MissingClaimed(self.claimed_path.clone()));
        }
        rewrite_in_place(&self.claimed_path, &self.item)?;

        let pending_path = self.root.dir(self.queue).join(self.item.id.file_name());
        retry_io(|| fs::rename(&self.claimed_path, &pending_path))
            .map_err(QueueError::io(&pending_path))?;

        debug!(id = %self.item.id, queue = %self.queue, "claim reverted");
        Ok(())
    }

    /// Rewrite content in the claimed file, then rename into the archive
    /// directory. The archive rename is the single linearization point, so
    /// the item is never visible in two places.
    fn transition_into(&mut self, archive: QueueName) -> Result<PathBuf, QueueError> {
        if !self.claimed_path.exists() {
            return Err(QueueError::MissingClaimed(self.claimed_path.clone()));
        }
        rewrite_in_place(&self.claimed_path, &self.item)?;

        let target = self.root.dir(archive).join(self.item.id.file_name());
        retry_io(|| fs::rename(&self.claimed_path, &target))
            .map_err(QueueError::io(&target))?;

        debug!(id = %self.item.id, archive = %archive, "terminal transition");
        Ok(target)
    }
}
