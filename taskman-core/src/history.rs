//! Task change narration.
//!
//! Consecutive [`TaskSnapshot`]s are compared field by field and every
//! changed field becomes one human-readable fragment. Fields are visited in
//! declaration order of [`TrackedField::ALL`] and fragments keep that order.

use std::fmt;

use crate::models::{ChangeType, HistoryEntry, HistoryWindow, TaskSnapshot};

/// Longest value shown in a narration fragment before truncation.
pub const MAX_VALUE_CHARS: usize = 60;
pub const ELLIPSIS: &str = "..";
pub const NO_CHANGES: &str = "Сохранение без изменений.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Name,
    Description,
    IsComplete,
    Status,
    Executor,
    Project,
    Sprint,
}

impl TrackedField {
    pub const ALL: [TrackedField; 7] = [
        Self::Name,
        Self::Description,
        Self::IsComplete,
        Self::Status,
        Self::Executor,
        Self::Project,
        Self::Sprint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::IsComplete => "is_complete",
            Self::Status => "status",
            Self::Executor => "executor",
            Self::Project => "project",
            Self::Sprint => "sprint",
        }
    }

    /// Localized display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "название",
            Self::Description => "содержание",
            Self::IsComplete => "завершена",
            Self::Status => "статус",
            Self::Executor => "исполнитель",
            Self::Project => "проект",
            Self::Sprint => "спринт",
        }
    }

    fn value(&self, snapshot: &TaskSnapshot) -> FieldValue {
        match self {
            Self::Name => FieldValue::Text(snapshot.name.clone()),
            Self::Description => FieldValue::Text(snapshot.description.clone()),
            Self::IsComplete => FieldValue::Flag(snapshot.is_complete),
            Self::Status => FieldValue::Ref(snapshot.status_id),
            Self::Executor => FieldValue::Ref(snapshot.executor_id),
            Self::Project => FieldValue::Ref(snapshot.project_id),
            Self::Sprint => FieldValue::Ref(snapshot.sprint_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Ref(Option<i64>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Flag(true) => f.write_str("да"),
            Self::Flag(false) => f.write_str("нет"),
            Self::Ref(Some(id)) => write!(f, "{}", id),
            Self::Ref(None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: TrackedField,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Field-level differences from `old` to `new`.
pub fn diff(old: &TaskSnapshot, new: &TaskSnapshot) -> Vec<FieldChange> {
    TrackedField::ALL
        .iter()
        .filter_map(|field| {
            let before = field.value(old);
            let after = field.value(new);
            (before != after).then(|| FieldChange {
                field: *field,
                old: before,
                new: after,
            })
        })
        .collect()
}

fn truncate_value(text: &str) -> String {
    if text.chars().count() > MAX_VALUE_CHARS {
        let head: String = text.chars().take(MAX_VALUE_CHARS).collect();
        format!("{}{}", head, ELLIPSIS)
    } else {
        text.to_string()
    }
}

/// One narration fragment for a single changed field.
pub fn narrate_change(change: &FieldChange) -> String {
    match (change.field, &change.old, &change.new) {
        (TrackedField::Project, old, FieldValue::Ref(None)) => {
            format!("Задача удалена из проекта №{}.", old)
        }
        (TrackedField::Project, _, FieldValue::Ref(Some(id))) => {
            format!("Задача добавлена в проект №{}.", id)
        }
        (TrackedField::Sprint, old, FieldValue::Ref(None)) => {
            format!("Задача удалена из спринта №{}.", old)
        }
        (TrackedField::Sprint, _, FieldValue::Ref(Some(id))) => {
            format!("Задача добавлена в спринт №{}.", id)
        }
        (field, _, new) => format!(
            "Поле '{}' изменено на '{}'.",
            field.label(),
            truncate_value(&new.to_string())
        ),
    }
}

/// Joined fragments, or [`NO_CHANGES`] for a save that changed nothing.
pub fn narrate(changes: &[FieldChange]) -> String {
    if changes.is_empty() {
        return NO_CHANGES.to_string();
    }
    changes
        .iter()
        .map(narrate_change)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One entry per snapshot in the window, oldest first.
///
/// Only updates carry a narration. A snapshot with no predecessor is the
/// creation event and is never diffed.
pub fn render_history(window: &HistoryWindow) -> Vec<HistoryEntry> {
    let mut prev = window.baseline.as_ref();
    let mut entries = Vec::with_capacity(window.snapshots.len());

    for snapshot in &window.snapshots {
        let narration = match (snapshot.change_type, prev) {
            (ChangeType::Updated, Some(before)) => narrate(&diff(before, snapshot)),
            _ => String::new(),
        };
        entries.push(HistoryEntry {
            recorded_at: snapshot.recorded_at,
            change_type: snapshot.change_type,
            label: snapshot.change_type.label().to_string(),
            narration,
        });
        prev = Some(snapshot);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(field: TrackedField, old: FieldValue, new: FieldValue) -> FieldChange {
        FieldChange { field, old, new }
    }

    #[test]
    fn project_removal_shows_old_id() {
        let c = change(
            TrackedField::Project,
            FieldValue::Ref(Some(3)),
            FieldValue::Ref(None),
        );
        assert_eq!(narrate_change(&c), "Задача удалена из проекта №3.");
    }

    #[test]
    fn sprint_removal_shows_old_id() {
        let c = change(
            TrackedField::Sprint,
            FieldValue::Ref(Some(7)),
            FieldValue::Ref(None),
        );
        assert_eq!(narrate_change(&c), "Задача удалена из спринта №7.");
    }

    #[test]
    fn moving_between_projects_names_the_new_one() {
        let c = change(
            TrackedField::Project,
            FieldValue::Ref(Some(3)),
            FieldValue::Ref(Some(4)),
        );
        assert_eq!(narrate_change(&c), "Задача добавлена в проект №4.");
    }

    #[test]
    fn status_change_uses_the_field_label() {
        let c = change(
            TrackedField::Status,
            FieldValue::Ref(None),
            FieldValue::Ref(Some(5)),
        );
        assert_eq!(narrate_change(&c), "Поле 'статус' изменено на '5'.");
    }

    #[test]
    fn truncation_boundary() {
        let exact = "x".repeat(MAX_VALUE_CHARS);
        assert_eq!(truncate_value(&exact), exact);

        let long = "ж".repeat(MAX_VALUE_CHARS + 1);
        let shown = truncate_value(&long);
        assert_eq!(shown.chars().count(), MAX_VALUE_CHARS + ELLIPSIS.len());
        assert!(shown.ends_with(ELLIPSIS));
    }

    #[test]
    fn empty_diff_narrates_no_changes() {
        assert_eq!(narrate(&[]), NO_CHANGES);
    }
}
