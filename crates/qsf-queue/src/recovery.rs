//! Stale-claim reversion.
//!
//! A pane that crashed while holding a claim leaves a `.claimed-*` file
//! behind. Once the owner's heartbeat is older than the staleness window
//! (3x the configured session timeout), the claim is reverted to pending by
//! renaming back, observable downstream as one retry.
//!
//! Running recovery twice in a row is a no-op: the first pass removes every
//! revertible file, the second finds nothing.

use std::fs;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use qsf_schemas::{claim_owner_from_file_name, id_from_file_name, ItemId, ItemStatus, WORK_QUEUES};

use crate::error::QueueError;
use crate::queue::{read_item_file, rewrite_in_place, QueueRoot};
use crate::retry::retry_io;

/// Revert claims whose owning pane's heartbeat is stale.
///
/// `heartbeat_of` reports the last heartbeat for a pane, `None` when the
/// pane has no checkpoint at all (also treated as stale). Returns the ids
/// reverted by this pass.
pub fn revert_stale_claims(
    root: &QueueRoot,
    heartbeat_of: impl Fn(u32) -> Option<DateTime<Utc>>,
    staleness: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<ItemId>, QueueError> {
    let mut reverted = Vec::new();

    for &queue in &WORK_QUEUES {
        let dir = root.dir(queue);
        let entries = retry_io(|| fs::read_dir(&dir)).map_err(QueueError::io(&dir))?;

        for entry in entries {
            let entry = entry.map_err(QueueError::io(&dir))?;
            let name = entry.file_name();
            let name = name.to_string_lossy().to_string();

            let Some((pane, _role)) = claim_owner_from_file_name(&name) else {
                continue;
            };
            let Some(id) = id_from_file_name(&name) else {
                continue;
            };

            let stale = match heartbeat_of(pane) {
                Some(hb) => now - hb > staleness,
                None => true,
            };
            if !stale {
                continue;
            }

            let claimed_path = entry.path();
            let mut item = match read_item_file(&claimed_path) {
                Ok(item) => item,
                // Owner finished or another recovery pass won meanwhile.
                Err(QueueError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    continue
                }
                Err(e) => return Err(e),
            };

            item.status = ItemStatus::Pending;
            item.claimed_by = None;
            item.claimed_at = None;
            rewrite_in_place(&claimed_path, &item)?;

            let pending_path = dir.join(id.file_name());
            match fs::rename(&claimed_path, &pending_path) {
                Ok(()) => {
                    info!(id = %id, queue = %queue, pane, "stale claim reverted");
                    reverted.push(id);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(QueueError::Io {
                        path: pending_path,
                        source,
                    })
                }
            }
        }
    }

    Ok(reverted)
}
