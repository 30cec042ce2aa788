use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{corrupt, Database};
use crate::error::Result;
use crate::models::{ChangeType, HistoryWindow, Task, TaskSnapshot};

fn snapshot_from_row(row: &Row) -> rusqlite::Result<TaskSnapshot> {
    let change_type: String = row.get("change_type")?;
    let change_type: ChangeType = change_type.parse().map_err(|e| corrupt(3, e))?;

    Ok(TaskSnapshot {
        history_id: row.get("history_id")?,
        task_id: row.get("task_id")?,
        prev_history_id: row.get("prev_history_id")?,
        change_type,
        recorded_at: row.get("recorded_at")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_complete: row.get("is_complete")?,
        created_at: row.get("created_at")?,
        completed_at: row.get("completed_at")?,
        status_id: row.get("status_id")?,
        executor_id: row.get("executor_id")?,
        project_id: row.get("project_id")?,
        sprint_id: row.get("sprint_id")?,
    })
}

/// Records `task` as it stands after `change`, linked to the task's previous
/// snapshot. Must run inside the transaction that wrote the task.
pub(super) fn append_snapshot(
    conn: &Connection,
    task: &Task,
    change: ChangeType,
    recorded_at: DateTime<Utc>,
) -> Result<i64> {
    let prev: Option<i64> = conn.query_row(
        "SELECT MAX(history_id) FROM task_history WHERE task_id = ?1",
        [task.id],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO task_history (
            task_id, prev_history_id, change_type, recorded_at,
            name, description, is_complete, created_at, completed_at,
            status_id, executor_id, project_id, sprint_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            task.id,
            prev,
            change.as_str(),
            recorded_at,
            task.name,
            task.description,
            task.is_complete,
            task.created_at,
            task.completed_at,
            task.status_id,
            task.executor_id,
            task.project_id,
            task.sprint_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// The `limit` most recent snapshots of a task, oldest first, with the
    /// snapshot preceding them as baseline.
    pub fn task_history_window(&self, task_id: i64, limit: u32) -> Result<HistoryWindow> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM task_history WHERE task_id = ?1
             ORDER BY history_id DESC LIMIT ?2",
        )?;
        let mut snapshots = stmt
            .query_map(params![task_id, i64::from(limit) + 1], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        snapshots.reverse();

        let baseline = if snapshots.len() > limit as usize {
            Some(snapshots.remove(0))
        } else {
            None
        };
        Ok(HistoryWindow {
            baseline,
            snapshots,
        })
    }
}
