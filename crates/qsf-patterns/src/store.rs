//! The on-disk store: append under lock, lock-free reads.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::Rng;

use crate::category::PatternCategory;
use crate::entry::PatternEntry;

/// Marker line preceding every appended entry.
pub const ENTRY_MARKER: &str = "<!-- entry -->";

const LOCK_ATTEMPTS: u32 = 40;
const LOCK_WAIT_MIN_MS: u64 = 10;
const LOCK_WAIT_MAX_MS: u64 = 60;

/// Read/append interface over `patterns/`.
#[derive(Debug, Clone)]
pub struct PatternStore {
    dir: PathBuf,
}

impl PatternStore {
    /// `dir` is the `patterns/` directory under the project root.
    pub fn new(dir: impl Into<PathBuf>) -> PatternStore {
        PatternStore { dir: dir.into() }
    }

    pub fn file_path(&self, category: PatternCategory) -> PathBuf {
        self.dir.join(category.file_name())
    }

    /// Parse all entries in a category. A missing file is an empty
    /// category. Blocks that do not parse are skipped.
    pub fn read(&self, category: PatternCategory) -> Result<Vec<PatternEntry>> {
        let path = self.file_path(category);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read pattern file: {}", path.display()))
            }
        };

        Ok(text
            .split(ENTRY_MARKER)
            .skip(1)
            .filter_map(PatternEntry::parse)
            .collect())
    }

    /// Append one entry under the category lock.
    ///
    /// Two sessions ending at the same instant are serialized here: the
    /// loser of the `create_new` race sleeps a bounded random wait and
    /// retries. Lock acquisition failing after all attempts is an error,
    /// not silent data loss.
    pub fn append(&self, category: PatternCategory, entry: &PatternEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create patterns dir: {}", self.dir.display()))?;

        let path = self.file_path(category);
        let _lock = CategoryLock::acquire(&path)?;

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open pattern file: {}", path.display()))?;

        let block = format!("\n{ENTRY_MARKER}\n{}", entry.render());
        f.write_all(block.as_bytes())
            .with_context(|| format!("append pattern entry: {}", path.display()))?;
        f.sync_all()
            .with_context(|| format!("fsync pattern file: {}", path.display()))?;

        Ok(())
    }

    /// Entry count per category file, for session-start context and status.
    pub fn count(&self, category: PatternCategory) -> Result<usize> {
        Ok(self.read(category)?.len())
    }
}

/// Exclusive per-category lock file. Held for the duration of one append;
/// removed on drop.
struct CategoryLock {
    path: PathBuf,
}

impl CategoryLock {
    fn acquire(category_file: &Path) -> Result<CategoryLock> {
        let path = category_file.with_extension("md.lock");
        let mut rng = rand::thread_rng();

        for _ in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut f) => {
                    // Owner pid, for post-mortem inspection of abandoned locks.
                    let _ = write!(f, "{}", std::process::id());
                    return Ok(CategoryLock { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let wait = rng.gen_range(LOCK_WAIT_MIN_MS..=LOCK_WAIT_MAX_MS);
                    std::thread::sleep(Duration::from_millis(wait));
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("create pattern lock: {}", path.display()))
                }
            }
        }

        bail!(
            "pattern category locked too long: {} (stale lock from a crashed session?)",
            path.display()
        );
    }
}

impl Drop for CategoryLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
