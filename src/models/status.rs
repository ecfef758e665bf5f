use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Lifecycle of a queued retry unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Failed,
    Completed,
}

impl QueueItemStatus {
    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueItemStatus::Pending),
            "processing" => Some(QueueItemStatus::Processing),
            "failed" => Some(QueueItemStatus::Failed),
            "completed" => Some(QueueItemStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueItemStatus::Failed | QueueItemStatus::Completed)
    }
}

impl Display for QueueItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            QueueItemStatus::Pending => write!(f, "pending"),
            QueueItemStatus::Processing => write!(f, "processing"),
            QueueItemStatus::Failed => write!(f, "failed"),
            QueueItemStatus::Completed => write!(f, "completed"),
        }
    }
}
