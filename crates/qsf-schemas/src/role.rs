//! Worker roles and the fixed producer/consumer graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::item::QueueName;

/// The four worker roles. The role fixes which queues a worker polls, in
/// what order, and which id prefix its pushed items carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    Researcher,
    Converter,
    Backtester,
    Optimizer,
}

pub const ALL_ROLES: [WorkerRole; 4] = [
    WorkerRole::Researcher,
    WorkerRole::Converter,
    WorkerRole::Backtester,
    WorkerRole::Optimizer,
];

impl WorkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Researcher => "researcher",
            WorkerRole::Converter => "converter",
            WorkerRole::Backtester => "backtester",
            WorkerRole::Optimizer => "optimizer",
        }
    }

    /// Id prefix for items this role pushes.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            WorkerRole::Researcher => "hyp",
            WorkerRole::Converter => "cv",
            WorkerRole::Backtester => "bt",
            WorkerRole::Optimizer => "opt",
        }
    }

    /// Input queues polled by this role, in poll order. The researcher is
    /// generative and polls nothing; the backtester priority-merges two
    /// queues. The write side of the role graph lives with the routing
    /// code, which pairs each destination with its payload shape.
    pub fn input_queues(&self) -> &'static [QueueName] {
        match self {
            WorkerRole::Researcher => &[],
            WorkerRole::Converter => &[QueueName::ToConvert],
            WorkerRole::Backtester => &[QueueName::Hypotheses, QueueName::ToBacktest],
            WorkerRole::Optimizer => &[QueueName::ToOptimize],
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleParseError(pub String);

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown worker role: {}", self.0)
    }
}

impl std::error::Error for RoleParseError {}

impl FromStr for WorkerRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "researcher" => Ok(WorkerRole::Researcher),
            "converter" => Ok(WorkerRole::Converter),
            "backtester" => Ok(WorkerRole::Backtester),
            "optimizer" => Ok(WorkerRole::Optimizer),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_graph_is_fixed() {
        assert!(WorkerRole::Researcher.input_queues().is_empty());
        assert_eq!(
            WorkerRole::Converter.input_queues(),
            &[QueueName::ToConvert]
        );
        assert_eq!(
            WorkerRole::Backtester.input_queues(),
            &[QueueName::Hypotheses, QueueName::ToBacktest]
        );
        assert_eq!(
            WorkerRole::Optimizer.input_queues(),
            &[QueueName::ToOptimize]
        );
    }

    #[test]
    fn roles_round_trip_as_strings() {
        for role in ALL_ROLES {
            assert_eq!(role.as_str().parse::<WorkerRole>().unwrap(), role);
        }
        assert!("janitor".parse::<WorkerRole>().is_err());
    }
}
