//! Session summary files: one markdown file per pane, one block appended
//! per session. The `status` command reads the tail of these for the
//! per-worker "last session" view.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::controller::{SessionOutcome, SessionReport};

/// Append one session's block to `session-summaries/pane-<n>.md`.
pub fn write_session_summary(dir: &Path, report: &SessionReport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create session-summaries dir: {}", dir.display()))?;

    let path = dir.join(format!("pane-{}.md", report.pane));
    let duration = (report.ended_at - report.started_at).num_seconds();

    let mut block = format!(
        "\n## Session {} ({})\n\n\
         - role: {}\n\
         - started: {}\n\
         - duration: {}s\n\
         - end reason: {:?}\n\
         - outcome: {}\n\
         - tasks: {} completed ({} rejected by gates), {} failed\n\
         - files created: {}\n\
         - estimated cost: ${:.2}\n\
         - pattern entries appended: {}\n",
        report.session_id,
        report.started_at.format("%Y-%m-%d"),
        report.role,
        report.started_at.format("%+"),
        duration,
        report.end_reason,
        match report.outcome {
            SessionOutcome::Complete => "complete",
            SessionOutcome::IncompleteNeedsDistill => "INCOMPLETE_NEEDS_DISTILL",
        },
        report.tasks_completed,
        report.tasks_rejected,
        report.tasks_failed,
        report.files_created,
        report.estimated_cost_usd,
        report.pattern_entries_appended,
    );

    if let Some((kind, message)) = &report.last_error {
        block.push_str(&format!("- last error: [{kind}] {message}\n"));
    }
    if !report.artifacts.is_empty() {
        block.push_str("- artifacts:\n");
        for a in &report.artifacts {
            block.push_str(&format!("  - {a}\n"));
        }
    }

    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open session summary: {}", path.display()))?;
    f.write_all(block.as_bytes())
        .with_context(|| format!("append session summary: {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{SessionEndReason, SessionOutcome};
    use chrono::Utc;
    use qsf_schemas::{ErrorKind, WorkerRole};
    use uuid::Uuid;

    #[test]
    fn summary_blocks_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let report = SessionReport {
            session_id: Uuid::new_v4(),
            pane: 3,
            role: WorkerRole::Optimizer,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            end_reason: SessionEndReason::Timeout,
            outcome: SessionOutcome::Complete,
            tasks_completed: 4,
            tasks_failed: 1,
            tasks_rejected: 1,
            files_created: 12,
            artifacts: vec!["output/strategies/good/RSI_ES".into()],
            estimated_cost_usd: 2.5,
            pattern_entries_appended: 3,
            last_error: Some((ErrorKind::Timeout, "model pass exceeded deadline".into())),
        };

        let path = write_session_summary(dir.path(), &report).unwrap();
        write_session_summary(dir.path(), &report).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.matches("## Session").count(), 2);
        assert!(text.contains("[timeout] model pass exceeded deadline"));
        assert!(text.contains("4 completed (1 rejected by gates), 1 failed"));
    }
}
