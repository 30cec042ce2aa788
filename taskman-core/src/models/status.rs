use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation;

/// A workflow stage. Statuses form a forest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStatusInput {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl CreateStatusInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatusInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub parent_id: Option<Option<i64>>,
}

impl UpdateStatusInput {
    pub fn merge(self, current: &Status) -> CreateStatusInput {
        CreateStatusInput {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            parent_id: self.parent_id.unwrap_or(current.parent_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusFilter {
    /// `Some(None)` selects roots.
    pub parent_id: Option<Option<i64>>,
}

/// One row of the status list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTreeEntry {
    #[serde(flatten)]
    pub status: Status,
    pub relative_name: String,
    pub root_id: i64,
    pub depth: usize,
}
