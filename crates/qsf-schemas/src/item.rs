//! Queue item envelope, priorities, status, and the error-kind taxonomy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ItemId;
use crate::role::WorkerRole;

// ---------------------------------------------------------------------------
// Queue names
// ---------------------------------------------------------------------------

/// The fixed queue set. Work queues are listed in pipeline order; the two
/// archive directories are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    Hypotheses,
    ToConvert,
    ToBacktest,
    ToOptimize,
    Completed,
    Failed,
}

/// The four live work queues, in pipeline order.
pub const WORK_QUEUES: [QueueName; 4] = [
    QueueName::Hypotheses,
    QueueName::ToConvert,
    QueueName::ToBacktest,
    QueueName::ToOptimize,
];

impl QueueName {
    pub fn dir_name(&self) -> &'static str {
        match self {
            QueueName::Hypotheses => "hypotheses",
            QueueName::ToConvert => "to-convert",
            QueueName::ToBacktest => "to-backtest",
            QueueName::ToOptimize => "to-optimize",
            QueueName::Completed => "completed",
            QueueName::Failed => "failed",
        }
    }

    pub fn all() -> [QueueName; 6] {
        [
            QueueName::Hypotheses,
            QueueName::ToConvert,
            QueueName::ToBacktest,
            QueueName::ToOptimize,
            QueueName::Completed,
            QueueName::Failed,
        ]
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Nominal item priority. Lower rank claims first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    /// One tier up, floor `High`.
    pub fn boosted(&self) -> Priority {
        match self {
            Priority::High | Priority::Medium => Priority::High,
            Priority::Low => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Failure kinds carried in `failed/{id}.json` payloads and session
/// summaries. Kinds, not types: the same kind may originate in several
/// crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Queue,
    Filesystem,
    Worker,
    Timeout,
    Budget,
    Compliance,
    Supervisor,
    Integrity,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Queue => "queue",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Worker => "worker",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Budget => "budget",
            ErrorKind::Compliance => "compliance",
            ErrorKind::Supervisor => "supervisor",
            ErrorKind::Integrity => "integrity",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `error` object appended to a failed item's payload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub kind: ErrorKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Queue item
// ---------------------------------------------------------------------------

/// One queue item. One file per item, in exactly one queue directory at a
/// time. `claimed_by` is `Some` iff the filename carries a
/// `.claimed-pane{n}-{role}` suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    /// Creator identity: `{worker-type}-{pane-id}`, e.g. `researcher-1`.
    pub created_by: String,
    pub priority: Priority,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    /// Opaque schema per queue.
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

impl QueueItem {
    /// Build a fresh pending item created by `role` on `pane`.
    pub fn new(role: WorkerRole, pane: u32, priority: Priority, payload: Value) -> QueueItem {
        let now = Utc::now();
        QueueItem {
            id: ItemId::generate(role.id_prefix(), now),
            created_at: now,
            created_by: format!("{}-{}", role.as_str(), pane),
            priority,
            status: ItemStatus::Pending,
            claimed_by: None,
            claimed_at: None,
            payload,
            error: None,
        }
    }

    /// Age of the item at `now`, in whole seconds (never negative).
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds().max(0)
    }

    /// Priority after the 10-minute age boost: one tier up for any item
    /// pending longer than the boost window, floor `High`.
    pub fn effective_priority(&self, now: DateTime<Utc>) -> Priority {
        const BOOST_AFTER_SECS: i64 = 600;
        if self.age_secs(now) > BOOST_AFTER_SECS {
            self.priority.boosted()
        } else {
            self.priority
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn effective_priority_boosts_one_tier_after_ten_minutes() {
        let mut item = QueueItem::new(
            WorkerRole::Researcher,
            1,
            Priority::Low,
            serde_json::json!({}),
        );
        let now = item.created_at;

        assert_eq!(item.effective_priority(now), Priority::Low);
        assert_eq!(
            item.effective_priority(now + Duration::seconds(600)),
            Priority::Low,
            "boost window is strictly greater than 10 minutes"
        );
        assert_eq!(
            item.effective_priority(now + Duration::seconds(601)),
            Priority::Medium
        );

        item.priority = Priority::High;
        assert_eq!(
            item.effective_priority(now + Duration::seconds(601)),
            Priority::High,
            "floor is high"
        );
    }

    #[test]
    fn item_serializes_without_null_claim_fields() {
        let item = QueueItem::new(
            WorkerRole::Backtester,
            2,
            Priority::High,
            serde_json::json!({"strategy": "RSI_ES"}),
        );
        let text = serde_json::to_string(&item).unwrap();
        assert!(!text.contains("claimed_by"));
        assert!(!text.contains("error"));

        let back: QueueItem = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id, item.id);
        assert_eq!(back.status, ItemStatus::Pending);
        assert_eq!(back.created_by, "backtester-2");
    }
}
