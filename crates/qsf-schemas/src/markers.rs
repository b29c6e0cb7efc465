//! The session marker grammar.
//!
//! Marker lines are the whole interface between the substrate and a model
//! pass: the controller emits `SESSION_START` / `SESSION_COMPLETE`, the
//! model emits the task and distillation markers on stdout. Any line that
//! does not parse as a marker is informational and skipped.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::role::WorkerRole;

/// One recognized marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// `SESSION_START: <role>-<iso8601>`
    SessionStart { role: WorkerRole, at: DateTime<Utc> },
    /// `TASK_START: <task-id>`
    TaskStart { task_id: String },
    /// `QUANT_TASK_COMPLETE: <task-id>`
    TaskComplete { task_id: String },
    /// `FILES_CREATED: <n>`
    FilesCreated { count: u32 },
    /// `ARTIFACTS: <comma-separated paths>`
    Artifacts { paths: Vec<String> },
    /// `QUANT_TASK_BLOCKED: <task-id>`
    TaskBlocked { task_id: String },
    /// `REASON: <text>`
    Reason { text: String },
    /// `DISTILLATION_COMPLETE`
    DistillationComplete,
    /// `PATTERNS_UPDATED: <file> (+<n> entries)`
    PatternsUpdated { file: String, entries: u32 },
    /// `SESSION_COMPLETE: <role>-<iso8601>`
    SessionComplete { role: WorkerRole, at: DateTime<Utc> },
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::SessionStart { role, at } => {
                write!(f, "SESSION_START: {}-{}", role, at.format("%+"))
            }
            Marker::TaskStart { task_id } => write!(f, "TASK_START: {task_id}"),
            Marker::TaskComplete { task_id } => write!(f, "QUANT_TASK_COMPLETE: {task_id}"),
            Marker::FilesCreated { count } => write!(f, "FILES_CREATED: {count}"),
            Marker::Artifacts { paths } => write!(f, "ARTIFACTS: {}", paths.join(",")),
            Marker::TaskBlocked { task_id } => write!(f, "QUANT_TASK_BLOCKED: {task_id}"),
            Marker::Reason { text } => write!(f, "REASON: {text}"),
            Marker::DistillationComplete => write!(f, "DISTILLATION_COMPLETE"),
            Marker::PatternsUpdated { file, entries } => {
                write!(f, "PATTERNS_UPDATED: {file} (+{entries} entries)")
            }
            Marker::SessionComplete { role, at } => {
                write!(f, "SESSION_COMPLETE: {}-{}", role, at.format("%+"))
            }
        }
    }
}

/// Parse one stdout line. Returns `None` for informational lines.
pub fn parse_marker(line: &str) -> Option<Marker> {
    let line = line.trim();

    if line == "DISTILLATION_COMPLETE" {
        return Some(Marker::DistillationComplete);
    }

    let (tag, rest) = line.split_once(':')?;
    let rest = rest.trim();

    match tag {
        "SESSION_START" => {
            let (role, at) = parse_role_timestamp(rest)?;
            Some(Marker::SessionStart { role, at })
        }
        "SESSION_COMPLETE" => {
            let (role, at) = parse_role_timestamp(rest)?;
            Some(Marker::SessionComplete { role, at })
        }
        "TASK_START" => Some(Marker::TaskStart {
            task_id: rest.to_string(),
        }),
        "QUANT_TASK_COMPLETE" => Some(Marker::TaskComplete {
            task_id: rest.to_string(),
        }),
        "QUANT_TASK_BLOCKED" => Some(Marker::TaskBlocked {
            task_id: rest.to_string(),
        }),
        "REASON" => Some(Marker::Reason {
            text: rest.to_string(),
        }),
        "FILES_CREATED" => rest.parse().ok().map(|count| Marker::FilesCreated { count }),
        "ARTIFACTS" => Some(Marker::Artifacts {
            paths: rest
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }),
        "PATTERNS_UPDATED" => parse_patterns_updated(rest),
        _ => None,
    }
}

/// `<role>-<iso8601>`, e.g. `backtester-2026-02-01T10:00:00+00:00`.
fn parse_role_timestamp(s: &str) -> Option<(WorkerRole, DateTime<Utc>)> {
    let (role_part, ts_part) = s.split_once('-')?;
    let role = role_part.parse().ok()?;
    let at = DateTime::parse_from_rfc3339(ts_part).ok()?.with_timezone(&Utc);
    Some((role, at))
}

/// `<file> (+<n> entries)`
fn parse_patterns_updated(s: &str) -> Option<Marker> {
    let open = s.rfind("(+")?;
    let file = s[..open].trim().to_string();
    let tail = &s[open + 2..];
    let end = tail.find(" entries)")?;
    let entries = tail[..end].parse().ok()?;
    Some(Marker::PatternsUpdated { file, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn grammar_round_trips() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let markers = [
            Marker::SessionStart {
                role: WorkerRole::Backtester,
                at,
            },
            Marker::TaskStart {
                task_id: "bt-20260201-100000-000001".into(),
            },
            Marker::TaskComplete {
                task_id: "bt-20260201-100000-000001".into(),
            },
            Marker::FilesCreated { count: 3 },
            Marker::Artifacts {
                paths: vec!["output/backtests/RSI_ES/rsi_es.json".into()],
            },
            Marker::TaskBlocked {
                task_id: "bt-20260201-100000-000002".into(),
            },
            Marker::Reason {
                text: "missing sample data".into(),
            },
            Marker::DistillationComplete,
            Marker::PatternsUpdated {
                file: "what-works.md".into(),
                entries: 2,
            },
            Marker::SessionComplete {
                role: WorkerRole::Backtester,
                at,
            },
        ];

        for m in markers {
            let line = m.to_string();
            assert_eq!(parse_marker(&line), Some(m), "line: {line}");
        }
    }

    #[test]
    fn informational_lines_are_skipped() {
        for line in [
            "",
            "thinking about RSI crossovers...",
            "NOT_A_MARKER: whatever",
            "SESSION_START: plumber-2026-02-01T10:00:00+00:00",
            "FILES_CREATED: many",
        ] {
            assert_eq!(parse_marker(line), None, "line: {line}");
        }
    }
}
