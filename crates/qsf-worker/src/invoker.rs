//! The model-invoker boundary.
//!
//! The substrate never interprets model output beyond the marker grammar
//! and file mtimes. `ProcessInvoker` is the production implementation: it
//! spawns the configured command, feeds the prompt on stdin, and collects
//! stdout lines until exit or deadline.
//!
//! The distiller pass is the same boundary. Its line protocol adds one
//! informational line shape the substrate understands:
//! `PATTERN_ENTRY: {json}` carrying a [`PatternDraft`]. Everything the
//! drafts describe is appended through the pattern store by the worker;
//! the distiller itself never writes pattern files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use qsf_patterns::EntryKind;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One task pass.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// The queue item id, or a generated id for generative (researcher)
    /// passes.
    pub task_id: String,
    /// Fully rendered prompt, session context included.
    pub prompt: String,
    /// Per-task soft deadline. Exceeding it kills the pass and counts as a
    /// failure.
    pub deadline: Duration,
    /// Extra environment for the child process.
    pub env: Vec<(String, String)>,
}

/// One distillation pass at session end.
#[derive(Debug, Clone)]
pub struct DistillRequest {
    pub prompt: String,
    pub deadline: Duration,
    pub env: Vec<(String, String)>,
}

/// Everything one pass printed.
#[derive(Debug, Clone, Default)]
pub struct TaskTranscript {
    pub lines: Vec<String>,
}

/// A pattern entry produced by the distiller, not yet written. The worker
/// resolves the target category from the draft kind and the active
/// market, unless the draft names a category stem explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDraft {
    pub kind: EntryKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum InvokerError {
    /// The pass exceeded its soft deadline and was killed.
    Timeout,
    /// The child could not be spawned or exited abnormally.
    Process(String),
    /// The distiller finished without `DISTILLATION_COMPLETE`.
    DistillIncomplete,
}

impl fmt::Display for InvokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokerError::Timeout => write!(f, "model pass exceeded its deadline"),
            InvokerError::Process(msg) => write!(f, "model process error: {msg}"),
            InvokerError::DistillIncomplete => {
                write!(f, "distiller exited without DISTILLATION_COMPLETE")
            }
        }
    }
}

impl std::error::Error for InvokerError {}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The boundary the worker loop drives. Implementations must enforce the
/// request deadline themselves (kill the pass, return `Timeout`).
pub trait ModelInvoker {
    fn run_task(
        &mut self,
        req: &TaskRequest,
    ) -> impl std::future::Future<Output = Result<TaskTranscript, InvokerError>> + Send;

    fn distill(
        &mut self,
        req: &DistillRequest,
    ) -> impl std::future::Future<Output = Result<Vec<PatternDraft>, InvokerError>> + Send;
}

// ---------------------------------------------------------------------------
// Process implementation
// ---------------------------------------------------------------------------

/// Spawns `command args...` per pass, prompt on stdin, markers on stdout.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    command: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ProcessInvoker {
    pub fn new(command: String, args: Vec<String>, working_dir: PathBuf) -> ProcessInvoker {
        ProcessInvoker {
            command,
            args,
            working_dir,
        }
    }

    async fn run_lines(
        &self,
        prompt: &str,
        deadline: Duration,
        env: &[(String, String)],
    ) -> Result<Vec<String>, InvokerError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (k, v) in env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| InvokerError::Process(format!("spawn {}: {e}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| InvokerError::Process(format!("write prompt: {e}")))?;
            drop(stdin);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InvokerError::Process("no stdout pipe".to_string()))?;

        let collect = async {
            let mut lines = Vec::new();
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(line = %line, "model stdout");
                lines.push(line);
            }
            let status = child
                .wait()
                .await
                .map_err(|e| InvokerError::Process(format!("wait: {e}")))?;
            if !status.success() {
                warn!(status = %status, "model pass exited non-zero");
            }
            Ok::<_, InvokerError>(lines)
        };

        match tokio::time::timeout(deadline, collect).await {
            Ok(result) => result,
            // kill_on_drop reaps the child when the timed-out future drops.
            Err(_) => Err(InvokerError::Timeout),
        }
    }
}

impl ModelInvoker for ProcessInvoker {
    async fn run_task(&mut self, req: &TaskRequest) -> Result<TaskTranscript, InvokerError> {
        let lines = self.run_lines(&req.prompt, req.deadline, &req.env).await?;
        Ok(TaskTranscript { lines })
    }

    async fn distill(&mut self, req: &DistillRequest) -> Result<Vec<PatternDraft>, InvokerError> {
        let lines = self.run_lines(&req.prompt, req.deadline, &req.env).await?;

        let mut drafts = Vec::new();
        let mut complete = false;
        for line in &lines {
            let trimmed = line.trim();
            if trimmed == "DISTILLATION_COMPLETE" {
                complete = true;
            } else if let Some(json) = trimmed.strip_prefix("PATTERN_ENTRY:") {
                match serde_json::from_str::<PatternDraft>(json.trim()) {
                    Ok(draft) => drafts.push(draft),
                    Err(e) => warn!(error = %e, "unparseable pattern draft skipped"),
                }
            }
        }

        if !complete {
            return Err(InvokerError::DistillIncomplete);
        }
        Ok(drafts)
    }
}
