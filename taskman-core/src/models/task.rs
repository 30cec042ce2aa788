use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub executor_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub sprint_id: Option<i64>,
}

impl CreateTaskInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_complete: false,
            status_id: None,
            executor_id: None,
            project_id: None,
            sprint_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        validation::required_text(&mut errors, "description", &self.description);
        errors.into_result()
    }
}

impl From<&Task> for CreateTaskInput {
    fn from(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            description: task.description.clone(),
            is_complete: task.is_complete,
            status_id: task.status_id,
            executor_id: task.executor_id,
            project_id: task.project_id,
            sprint_id: task.sprint_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_complete: Option<bool>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub status_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub executor_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub project_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub sprint_id: Option<Option<i64>>,
}

impl UpdateTaskInput {
    pub fn merge(self, current: &Task) -> CreateTaskInput {
        CreateTaskInput {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            is_complete: self.is_complete.unwrap_or(current.is_complete),
            status_id: self.status_id.unwrap_or(current.status_id),
            executor_id: self.executor_id.unwrap_or(current.executor_id),
            project_id: self.project_id.unwrap_or(current.project_id),
            sprint_id: self.sprint_id.unwrap_or(current.sprint_id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrder {
    /// Ascending id.
    #[default]
    Id,
    /// Open tasks first, newest first within each group.
    OpenFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<i64>,
    pub sprint_id: Option<i64>,
    pub status_id: Option<i64>,
    pub executor_id: Option<i64>,
    pub is_complete: Option<bool>,
    #[serde(default)]
    pub order: TaskOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_and_description_are_both_reported() {
        let err = CreateTaskInput::new(" ", "").validate().unwrap_err();
        assert!(err.has_field("name"));
        assert!(err.has_field("description"));
    }
}
