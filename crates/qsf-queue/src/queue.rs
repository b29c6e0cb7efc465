//! The queue root: layout, push, claim, and depth inspection.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use qsf_schemas::{
    id_from_file_name, ItemId, ItemStatus, QueueItem, QueueName, WorkerRole, WORK_QUEUES,
};

use crate::claimed::ClaimedItem;
use crate::error::QueueError;
use crate::retry::retry_io;

/// Handle on the `queues/` directory. Cheap to clone; all state is on disk.
#[derive(Debug, Clone)]
pub struct QueueRoot {
    root: PathBuf,
}

/// Pending / in-progress counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDepths {
    pub pending: usize,
    pub in_progress: usize,
}

impl QueueRoot {
    /// `root` is the `queues/` directory under the project root.
    pub fn new(root: impl Into<PathBuf>) -> QueueRoot {
        QueueRoot { root: root.into() }
    }

    pub fn dir(&self, queue: QueueName) -> PathBuf {
        self.root.join(queue.dir_name())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create all six queue directories.
    pub fn ensure_layout(&self) -> Result<(), QueueError> {
        for q in QueueName::all() {
            let dir = self.dir(q);
            retry_io(|| fs::create_dir_all(&dir)).map_err(QueueError::io(&dir))?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Push
    // -----------------------------------------------------------------------

    /// Write `item` into `queue`. Temp file + fsync + rename; the rename is
    /// the point at which consumers can observe the item.
    pub fn push(&self, queue: QueueName, item: &QueueItem) -> Result<ItemId, QueueError> {
        let dir = self.dir(queue);
        let target = dir.join(item.id.file_name());
        if target.exists() {
            return Err(QueueError::DuplicateId(item.id.clone()));
        }

        let tmp = dir.join(format!(".tmp-{}-{}", item.id, std::process::id()));
        write_item_file(&tmp, item)?;
        retry_io(|| fs::rename(&tmp, &target)).map_err(QueueError::io(&target))?;

        debug!(id = %item.id, queue = %queue, priority = %item.priority, "pushed");
        Ok(item.id.clone())
    }

    // -----------------------------------------------------------------------
    // Claim
    // -----------------------------------------------------------------------

    /// Claim the next item across `queues`, which are merged into one
    /// candidate list ordered by (effective priority desc, created-at asc).
    ///
    /// Never blocks: a lost rename race moves on to the next candidate, and
    /// an exhausted list returns `Ok(None)` ("no work") with no side
    /// effects.
    pub fn claim(
        &self,
        queues: &[QueueName],
        pane: u32,
        role: WorkerRole,
    ) -> Result<Option<ClaimedItem>, QueueError> {
        let now = Utc::now();
        let mut candidates = Vec::new();

        for &queue in queues {
            self.collect_pending(queue, &mut candidates)?;
        }

        candidates.sort_by(|a, b| {
            let ka = (a.item.effective_priority(now).rank(), a.item.created_at);
            let kb = (b.item.effective_priority(now).rank(), b.item.created_at);
            ka.cmp(&kb).then_with(|| a.item.id.cmp(&b.item.id))
        });

        for cand in candidates {
            let claimed_path = self
                .dir(cand.queue)
                .join(cand.item.id.claimed_file_name(pane, role.as_str()));

            match fs::rename(&cand.path, &claimed_path) {
                Ok(()) => {
                    let mut item = cand.item;
                    item.status = ItemStatus::InProgress;
                    item.claimed_by = Some(format!("pane{}-{}", pane, role.as_str()));
                    item.claimed_at = Some(now);
                    // We own the claimed file now; record the claim fields in it.
                    rewrite_in_place(&claimed_path, &item)?;

                    debug!(id = %item.id, queue = %cand.queue, pane, "claimed");
                    return Ok(Some(ClaimedItem::new(
                        self.clone(),
                        cand.queue,
                        claimed_path,
                        item,
                    )));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // A peer won this candidate; take the next one.
                    continue;
                }
                Err(source) => {
                    return Err(QueueError::Io {
                        path: cand.path,
                        source,
                    })
                }
            }
        }

        Ok(None)
    }

    fn collect_pending(
        &self,
        queue: QueueName,
        out: &mut Vec<Candidate>,
    ) -> Result<(), QueueError> {
        let dir = self.dir(queue);
        let entries = retry_io(|| fs::read_dir(&dir)).map_err(QueueError::io(&dir))?;

        for entry in entries {
            let entry = entry.map_err(QueueError::io(&dir))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.ends_with(".json") || name.contains(".claimed") || name.starts_with(".tmp-") {
                continue;
            }

            let path = entry.path();
            match read_item_file(&path) {
                Ok(item) => out.push(Candidate { queue, path, item }),
                Err(QueueError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    // Claimed or completed between listing and reading.
                    continue;
                }
                Err(e) => {
                    // A malformed file must not wedge the whole queue.
                    warn!(path = %path.display(), error = %e, "skipping unreadable queue item");
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Pending / in-progress counts for one queue directory.
    pub fn depths(&self, queue: QueueName) -> Result<QueueDepths, QueueError> {
        let dir = self.dir(queue);
        let entries = retry_io(|| fs::read_dir(&dir)).map_err(QueueError::io(&dir))?;

        let mut depths = QueueDepths::default();
        for entry in entries {
            let entry = entry.map_err(QueueError::io(&dir))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.ends_with(".json") || name.starts_with(".tmp-") {
                continue;
            }
            if name.contains(".claimed") {
                depths.in_progress += 1;
            } else {
                depths.pending += 1;
            }
        }
        Ok(depths)
    }

    /// Depths for all four work queues, in pipeline order.
    pub fn all_depths(&self) -> Result<Vec<(QueueName, QueueDepths)>, QueueError> {
        WORK_QUEUES
            .iter()
            .map(|&q| self.depths(q).map(|d| (q, d)))
            .collect()
    }

    /// Parse every item file in a queue directory (pending and claimed),
    /// for status views and tests.
    pub fn list_items(&self, queue: QueueName) -> Result<Vec<QueueItem>, QueueError> {
        let dir = self.dir(queue);
        let entries = retry_io(|| fs::read_dir(&dir)).map_err(QueueError::io(&dir))?;

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(QueueError::io(&dir))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.ends_with(".json") || name.starts_with(".tmp-") {
                continue;
            }
            if id_from_file_name(&name).is_none() {
                continue;
            }
            match read_item_file(&entry.path()) {
                Ok(item) => items.push(item),
                Err(_) => continue,
            }
        }
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    /// Re-adopt a claim this pane already holds on disk (startup resume
    /// after a crash). Returns `None` when no claimed file for `id` is
    /// owned by exactly this pane and role.
    pub fn adopt_claim(
        &self,
        id: &ItemId,
        pane: u32,
        role: WorkerRole,
    ) -> Result<Option<ClaimedItem>, QueueError> {
        let Some((queue, path)) = self.find_claimed(id)? else {
            return Ok(None);
        };
        let expected = id.claimed_file_name(pane, role.as_str());
        if path.file_name().map(|n| n.to_string_lossy().to_string()) != Some(expected) {
            return Ok(None);
        }
        let item = read_item_file(&path)?;
        Ok(Some(ClaimedItem::new(self.clone(), queue, path, item)))
    }

    /// Locate the claimed file for `id`, if any pane holds it.
    pub fn find_claimed(&self, id: &ItemId) -> Result<Option<(QueueName, PathBuf)>, QueueError> {
        for &queue in &WORK_QUEUES {
            let dir = self.dir(queue);
            let entries = retry_io(|| fs::read_dir(&dir)).map_err(QueueError::io(&dir))?;
            for entry in entries {
                let entry = entry.map_err(QueueError::io(&dir))?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.contains(".claimed") && id_from_file_name(&name).as_ref() == Some(id) {
                    return Ok(Some((queue, entry.path())));
                }
            }
        }
        Ok(None)
    }
}

struct Candidate {
    queue: QueueName,
    path: PathBuf,
    item: QueueItem,
}

// ---------------------------------------------------------------------------
// File helpers shared with claimed-item transitions
// ---------------------------------------------------------------------------

pub(crate) fn read_item_file(path: &Path) -> Result<QueueItem, QueueError> {
    let text = retry_io(|| fs::read_to_string(path)).map_err(QueueError::io(path))?;
    serde_json::from_str(&text).map_err(|e| QueueError::MalformedItem {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub(crate) fn write_item_file(path: &Path, item: &QueueItem) -> Result<(), QueueError> {
    let json =
        serde_json::to_string_pretty(item).expect("queue item serialization must not fail");

    retry_io(|| {
        let mut f = fs::File::create(path)?;
        f.write_all(json.as_bytes())?;
        f.write_all(b"\n")?;
        f.sync_all()
    })
    .map_err(QueueError::io(path))
}

/// Rewrite an owned file's contents via temp + rename in the same directory.
pub(crate) fn rewrite_in_place(path: &Path, item: &QueueItem) -> Result<(), QueueError> {
    let tmp = path.with_extension("json.tmp");
    write_item_file(&tmp, item)?;
    retry_io(|| fs::rename(&tmp, path)).map_err(QueueError::io(path))?;
    Ok(())
}
