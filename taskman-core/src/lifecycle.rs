//! Save-time bookkeeping for tasks and projects.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Task, User};

/// Completion timestamp after a save.
///
/// Set when the record is complete and has no timestamp yet, cleared when it
/// is not complete. Every other combination keeps `current`.
pub fn completion_timestamp(
    is_complete: bool,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (is_complete, current) {
        (true, None) => Some(now),
        (false, Some(_)) => None,
        (_, current) => current,
    }
}

/// Raised when a stored task moves to a different status and its executor
/// can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChangeNotice {
    pub task_id: i64,
    pub task_name: String,
    pub old_status_id: Option<i64>,
    pub new_status_id: Option<i64>,
    pub executor_id: i64,
    pub email: String,
}

impl StatusChangeNotice {
    /// `None` unless the status actually changed and the executor has a
    /// contact address.
    pub fn detect(before: &Task, after: &Task, executor: Option<&User>) -> Option<Self> {
        if before.status_id == after.status_id {
            return None;
        }
        let executor = executor?;
        let email = executor.contact_email()?;
        Some(Self {
            task_id: after.id,
            task_name: after.name.clone(),
            old_status_id: before.status_id,
            new_status_id: after.status_id,
            executor_id: executor.id,
            email: email.to_string(),
        })
    }
}

/// Outbound channel for status-change notices.
pub trait Notifier: Send + Sync {
    fn status_changed(&self, notice: &StatusChangeNotice);
}

/// Emits every notice as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn status_changed(&self, notice: &StatusChangeNotice) {
        tracing::info!(
            task_id = notice.task_id,
            executor_id = notice.executor_id,
            email = %notice.email,
            old_status = ?notice.old_status_id,
            new_status = ?notice.new_status_id,
            "Task status changed, executor notified"
        );
    }
}

/// Drops every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn status_changed(&self, _notice: &StatusChangeNotice) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn completion_state_machine() {
        let now = Utc::now();
        let earlier = now - Duration::hours(1);

        assert_eq!(completion_timestamp(true, None, now), Some(now));
        assert_eq!(completion_timestamp(true, Some(earlier), now), Some(earlier));
        assert_eq!(completion_timestamp(false, Some(earlier), now), None);
        assert_eq!(completion_timestamp(false, None, now), None);
    }

    fn task(status_id: Option<i64>) -> Task {
        Task {
            id: 1,
            name: "A".into(),
            description: "B".into(),
            is_complete: false,
            created_at: Utc::now(),
            completed_at: None,
            status_id,
            executor_id: Some(3),
            project_id: None,
            sprint_id: None,
        }
    }

    fn executor(email: Option<&str>) -> User {
        User {
            id: 3,
            username: "bob".into(),
            email: email.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn notice_requires_a_status_change_and_an_address() {
        let with_mail = executor(Some("bob@example.com"));
        let without_mail = executor(None);

        assert!(StatusChangeNotice::detect(&task(Some(1)), &task(Some(1)), Some(&with_mail)).is_none());
        assert!(StatusChangeNotice::detect(&task(Some(1)), &task(Some(2)), Some(&without_mail)).is_none());
        assert!(StatusChangeNotice::detect(&task(Some(1)), &task(Some(2)), None).is_none());

        let notice =
            StatusChangeNotice::detect(&task(Some(1)), &task(Some(2)), Some(&with_mail)).unwrap();
        assert_eq!(notice.new_status_id, Some(2));
        assert_eq!(notice.email, "bob@example.com");
    }
}
