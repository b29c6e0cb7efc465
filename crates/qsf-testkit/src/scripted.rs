//! A model invoker that replays a script.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use qsf_worker::{
    DistillRequest, InvokerError, ModelInvoker, PatternDraft, TaskRequest, TaskTranscript,
};

/// One scripted pass: files created on disk, then marker lines returned.
/// `{task_id}` in a line is replaced with the live task id.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTask {
    pub lines: Vec<String>,
    /// (path relative to the project root, contents).
    pub files: Vec<(String, String)>,
}

impl ScriptedTask {
    /// A pass that writes `files` and reports completion with them as
    /// artifacts.
    pub fn completing(files: Vec<(String, String)>) -> ScriptedTask {
        let artifact_list = files
            .iter()
            .map(|(p, _)| p.clone())
            .collect::<Vec<_>>()
            .join(",");
        ScriptedTask {
            lines: vec![
                "QUANT_TASK_COMPLETE: {task_id}".to_string(),
                format!("FILES_CREATED: {}", files.len()),
                format!("ARTIFACTS: {artifact_list}"),
            ],
            files,
        }
    }

    /// A pass that prints the completion phrase but creates nothing.
    pub fn phrase_only() -> ScriptedTask {
        ScriptedTask {
            lines: vec![
                "QUANT_TASK_COMPLETE: {task_id}".to_string(),
                "FILES_CREATED: 1".to_string(),
            ],
            files: vec![],
        }
    }

    /// A pass that reports itself blocked.
    pub fn blocked(reason: &str) -> ScriptedTask {
        ScriptedTask {
            lines: vec![
                "QUANT_TASK_BLOCKED: {task_id}".to_string(),
                format!("REASON: {reason}"),
            ],
            files: vec![],
        }
    }
}

/// Replays scripted tasks in order; an exhausted script yields passes with
/// no markers (which the loop counts as failures).
#[derive(Debug)]
pub struct ScriptedInvoker {
    root: PathBuf,
    tasks: VecDeque<ScriptedTask>,
    distill_drafts: Vec<PatternDraft>,
    distill_failures_remaining: u32,
    pub tasks_run: u32,
    pub distills_run: u32,
}

impl ScriptedInvoker {
    pub fn new(root: impl Into<PathBuf>, tasks: Vec<ScriptedTask>) -> ScriptedInvoker {
        ScriptedInvoker {
            root: root.into(),
            tasks: tasks.into(),
            distill_drafts: Vec::new(),
            distill_failures_remaining: 0,
            tasks_run: 0,
            distills_run: 0,
        }
    }

    /// Drafts the distiller returns at session end.
    pub fn with_distill_drafts(mut self, drafts: Vec<PatternDraft>) -> ScriptedInvoker {
        self.distill_drafts = drafts;
        self
    }

    /// Make the first `n` distill passes fail (INCOMPLETE_NEEDS_DISTILL
    /// path).
    pub fn failing_distills(mut self, n: u32) -> ScriptedInvoker {
        self.distill_failures_remaining = n;
        self
    }
}

impl ModelInvoker for ScriptedInvoker {
    async fn run_task(&mut self, req: &TaskRequest) -> Result<TaskTranscript, InvokerError> {
        self.tasks_run += 1;
        let Some(task) = self.tasks.pop_front() else {
            return Ok(TaskTranscript {
                lines: vec!["script exhausted".to_string()],
            });
        };

        for (rel, contents) in &task.files {
            let path = self.root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| InvokerError::Process(e.to_string()))?;
            }
            fs::write(&path, contents).map_err(|e| InvokerError::Process(e.to_string()))?;
        }

        let lines = task
            .lines
            .iter()
            .map(|l| l.replace("{task_id}", &req.task_id))
            .collect();
        Ok(TaskTranscript { lines })
    }

    async fn distill(&mut self, _req: &DistillRequest) -> Result<Vec<PatternDraft>, InvokerError> {
        self.distills_run += 1;
        if self.distill_failures_remaining > 0 {
            self.distill_failures_remaining -= 1;
            return Err(InvokerError::DistillIncomplete);
        }
        Ok(self.distill_drafts.clone())
    }
}
