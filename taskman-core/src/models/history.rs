use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Display label shown in the task history table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Задача создана",
            Self::Updated => "Задача изменена",
            Self::Deleted => "Задача удалена",
        }
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown change type '{}'", other)),
        }
    }
}

/// Full state of a task at one point of its mutation timeline. Never updated
/// after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub history_id: i64,
    pub task_id: i64,
    pub prev_history_id: Option<i64>,
    pub change_type: ChangeType,
    pub recorded_at: DateTime<Utc>,
    pub name: String,
    pub description: String,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status_id: Option<i64>,
    pub executor_id: Option<i64>,
    pub project_id: Option<i64>,
    pub sprint_id: Option<i64>,
}

/// The most recent snapshots of one task, oldest first, plus the snapshot
/// just before them so the oldest one can still be diffed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryWindow {
    pub baseline: Option<TaskSnapshot>,
    pub snapshots: Vec<TaskSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recorded_at: DateTime<Utc>,
    pub change_type: ChangeType,
    pub label: String,
    pub narration: String,
}
