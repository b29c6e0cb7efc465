//! Completion verification: the phrase-plus-files rule.
//!
//! Treating phrase-only completion as success silently corrupts downstream
//! queues, so the rule is enforced here, once, for every role.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use qsf_schemas::{parse_marker, Marker};

/// What one model pass reported, folded from its stdout marker lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPassResult {
    pub completed_task: Option<String>,
    pub blocked_task: Option<String>,
    pub blocked_reason: Option<String>,
    pub files_created_claimed: u32,
    pub artifacts: Vec<PathBuf>,
    pub distillation_complete: bool,
    pub patterns_updated: Vec<(String, u32)>,
}

impl ModelPassResult {
    /// Fold a stdout stream. Unrecognized lines are informational and
    /// ignored; later markers of the same kind win.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> ModelPassResult {
        let mut result = ModelPassResult::default();
        for line in lines {
            match parse_marker(line) {
                Some(Marker::TaskComplete { task_id }) => result.completed_task = Some(task_id),
                Some(Marker::TaskBlocked { task_id }) => result.blocked_task = Some(task_id),
                Some(Marker::Reason { text }) => result.blocked_reason = Some(text),
                Some(Marker::FilesCreated { count }) => result.files_created_claimed = count,
                Some(Marker::Artifacts { paths }) => {
                    result.artifacts = paths.into_iter().map(PathBuf::from).collect()
                }
                Some(Marker::DistillationComplete) => result.distillation_complete = true,
                Some(Marker::PatternsUpdated { file, entries }) => {
                    result.patterns_updated.push((file, entries))
                }
                _ => {}
            }
        }
        result
    }
}

/// Verdict on one model pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionCheck {
    /// Phrase present AND at least one file newer than the task start.
    Verified { new_files: Vec<PathBuf> },
    /// The model said done but created nothing. A failure; retry.
    PhraseWithoutFiles,
    /// No completion phrase at all.
    NoCompletionPhrase,
    /// The model reported itself blocked.
    Blocked { reason: String },
}

/// Apply the hard completion rule to one model pass.
pub fn check_completion(
    result: &ModelPassResult,
    output_root: &Path,
    task_started_at: SystemTime,
) -> CompletionCheck {
    if let Some(task) = &result.blocked_task {
        let reason = result
            .blocked_reason
            .clone()
            .unwrap_or_else(|| format!("task {task} blocked without a reason"));
        return CompletionCheck::Blocked { reason };
    }

    if result.completed_task.is_none() {
        return CompletionCheck::NoCompletionPhrase;
    }

    let new_files = newer_files_under(output_root, task_started_at);
    if new_files.is_empty() {
        CompletionCheck::PhraseWithoutFiles
    } else {
        CompletionCheck::Verified { new_files }
    }
}

/// Files under `root` (recursively) whose mtime is strictly later than
/// `since`. Unreadable entries are skipped: verification must never wedge
/// on a permissions oddity in the output tree.
pub fn newer_files_under(root: &Path, since: SystemTime) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect_newer(root, since, &mut out);
    out.sort();
    out
}

fn collect_newer(dir: &Path, since: SystemTime, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_newer(&path, since, out);
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if let Ok(mtime) = meta.modified() {
            if mtime > since {
                out.push(path);
            }
        }
    }
}
