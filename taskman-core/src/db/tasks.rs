use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::history::append_snapshot;
use super::projects::find_project;
use super::sprints::find_sprint;
use super::statuses::{find_status, first_child};
use super::users::find_user;
use super::{Conditions, Database};
use crate::error::{Result, ValidationError};
use crate::lifecycle::{completion_timestamp, StatusChangeNotice};
use crate::models::{
    ChangeType, CreateTaskInput, Page, PageRequest, Task, TaskFilter, TaskOrder, UpdateTaskInput,
};

const COLUMNS: &str = "id, name, description, is_complete, created_at, completed_at, \
                       status_id, executor_id, project_id, sprint_id";

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
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

fn find_task(conn: &Connection, id: i64) -> Result<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], task_from_row).optional()?)
}

/// Every reference on the input must name an existing record.
fn check_references(conn: &Connection, input: &CreateTaskInput) -> Result<()> {
    let mut errors = ValidationError::new();
    if let Some(id) = input.status_id {
        if find_status(conn, id)?.is_none() {
            errors.add("status_id", format!("status {} does not exist", id));
        }
    }
    if let Some(id) = input.executor_id {
        if find_user(conn, id)?.is_none() {
            errors.add("executor_id", format!("user {} does not exist", id));
        }
    }
    if let Some(id) = input.project_id {
        if find_project(conn, id)?.is_none() {
            errors.add("project_id", format!("project {} does not exist", id));
        }
    }
    if let Some(id) = input.sprint_id {
        if find_sprint(conn, id)?.is_none() {
            errors.add("sprint_id", format!("sprint {} does not exist", id));
        }
    }
    Ok(errors.into_result()?)
}

/// A task reference cleared when the record it points at is deleted.
#[derive(Debug, Clone, Copy)]
pub(super) enum TaskRef {
    Status,
    Project,
    Sprint,
}

impl TaskRef {
    fn column(self) -> &'static str {
        match self {
            Self::Status => "status_id",
            Self::Project => "project_id",
            Self::Sprint => "sprint_id",
        }
    }

    fn clear(self, task: &mut Task) {
        match self {
            Self::Status => task.status_id = None,
            Self::Project => task.project_id = None,
            Self::Sprint => task.sprint_id = None,
        }
    }
}

/// Clears `reference` on every task pointing at `id` and records an update
/// snapshot for each. Must run inside the transaction deleting the target.
pub(super) fn detach_tasks(conn: &Connection, reference: TaskRef, id: i64) -> Result<usize> {
    let column = reference.column();
    let sql = format!("SELECT {} FROM tasks WHERE {} = ?1 ORDER BY id", COLUMNS, column);
    let tasks = conn
        .prepare(&sql)?
        .query_map([id], task_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if tasks.is_empty() {
        return Ok(0);
    }

    conn.execute(
        &format!("UPDATE tasks SET {0} = NULL WHERE {0} = ?1", column),
        [id],
    )?;
    let now = Utc::now();
    for mut task in tasks.iter().cloned() {
        reference.clear(&mut task);
        append_snapshot(conn, &task, ChangeType::Updated, now)?;
    }

    tracing::debug!(count = tasks.len(), column, target_id = id, "Tasks detached");
    Ok(tasks.len())
}

/// Writes `input` over `current` and appends the update snapshot in one
/// transaction.
fn save_task(
    conn: &mut Connection,
    current: Task,
    input: CreateTaskInput,
) -> Result<(Task, Option<StatusChangeNotice>)> {
    let tx = conn.transaction()?;
    check_references(&tx, &input)?;

    let now = Utc::now();
    let task = Task {
        completed_at: completion_timestamp(input.is_complete, current.completed_at, now),
        name: input.name,
        description: input.description,
        is_complete: input.is_complete,
        status_id: input.status_id,
        executor_id: input.executor_id,
        project_id: input.project_id,
        sprint_id: input.sprint_id,
        ..current.clone()
    };

    tx.execute(
        "UPDATE tasks SET name = ?1, description = ?2, is_complete = ?3, completed_at = ?4,
             status_id = ?5, executor_id = ?6, project_id = ?7, sprint_id = ?8
         WHERE id = ?9",
        params![
            task.name,
            task.description,
            task.is_complete,
            task.completed_at,
            task.status_id,
            task.executor_id,
            task.project_id,
            task.sprint_id,
            task.id,
        ],
    )?;
    append_snapshot(&tx, &task, ChangeType::Updated, now)?;

    let executor = match task.executor_id {
        Some(id) => find_user(&tx, id)?,
        None => None,
    };
    let notice = StatusChangeNotice::detect(&current, &task, executor.as_ref());
    tx.commit()?;

    tracing::debug!(task_id = task.id, "Task saved");
    Ok((task, notice))
}

impl Database {
    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        input.validate()?;
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        check_references(&tx, &input)?;

        let now = Utc::now();
        let completed_at = completion_timestamp(input.is_complete, None, now);
        tx.execute(
            "INSERT INTO tasks (
                name, description, is_complete, created_at, completed_at,
                status_id, executor_id, project_id, sprint_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                input.name,
                input.description,
                input.is_complete,
                now,
                completed_at,
                input.status_id,
                input.executor_id,
                input.project_id,
                input.sprint_id,
            ],
        )?;
        let task = Task {
            id: tx.last_insert_rowid(),
            name: input.name,
            description: input.description,
            is_complete: input.is_complete,
            created_at: now,
            completed_at,
            status_id: input.status_id,
            executor_id: input.executor_id,
            project_id: input.project_id,
            sprint_id: input.sprint_id,
        };
        append_snapshot(&tx, &task, ChangeType::Created, now)?;
        tx.commit()?;

        tracing::debug!(task_id = task.id, "Task created");
        Ok(task)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        find_task(&self.lock(), id)
    }

    pub fn list_tasks(&self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>> {
        let mut conditions = Conditions::default();
        if let Some(id) = filter.project_id {
            conditions.push("project_id = ?", id);
        }
        if let Some(id) = filter.sprint_id {
            conditions.push("sprint_id = ?", id);
        }
        if let Some(id) = filter.status_id {
            conditions.push("status_id = ?", id);
        }
        if let Some(id) = filter.executor_id {
            conditions.push("executor_id = ?", id);
        }
        if let Some(done) = filter.is_complete {
            conditions.push("is_complete = ?", done);
        }
        let order = match filter.order {
            TaskOrder::Id => "id",
            TaskOrder::OpenFirst => "is_complete, id DESC",
        };

        let conn = self.lock();
        let count = conditions.count(&conn, "tasks")?;
        let sql = format!(
            "SELECT {} FROM tasks{} ORDER BY {} LIMIT ? OFFSET ?",
            COLUMNS,
            conditions.sql(),
            order
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(
                rusqlite::params_from_iter(conditions.paged(page)),
                task_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Page { count, results })
    }

    /// Replaces every writable field. `None` when the task does not exist.
    pub fn update_task(&self, id: i64, input: CreateTaskInput) -> Result<Option<Task>> {
        input.validate()?;
        let (task, notice) = {
            let mut conn = self.lock();
            let Some(current) = find_task(&conn, id)? else {
                return Ok(None);
            };
            save_task(&mut conn, current, input)?
        };

        if let Some(notice) = notice {
            self.notifier.status_changed(&notice);
        }
        Ok(Some(task))
    }

    pub fn patch_task(&self, id: i64, input: UpdateTaskInput) -> Result<Option<Task>> {
        let Some(current) = self.get_task(id)? else {
            return Ok(None);
        };
        self.update_task(id, input.merge(&current))
    }

    /// Deletes the task and records its final state as a deleted snapshot.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let Some(task) = find_task(&tx, id)? else {
            return Ok(false);
        };

        tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        append_snapshot(&tx, &task, ChangeType::Deleted, Utc::now())?;
        tx.commit()?;

        tracing::info!(task_id = id, "Task deleted");
        Ok(true)
    }

    /// Moves the task one level down its status tree: to the first child of
    /// the current status, or to the first root when it has none. Nothing is
    /// saved when there is nowhere to go.
    pub fn advance_task_status(&self, id: i64) -> Result<Option<Task>> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        let next = first_child(&self.lock(), task.status_id)?;
        match next {
            Some(status) => self.move_task_to(task, status.id),
            None => Ok(Some(task)),
        }
    }

    /// Moves the task to the parent of its current status, if there is one.
    pub fn retreat_task_status(&self, id: i64) -> Result<Option<Task>> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        let parent = match task.status_id {
            Some(status_id) => find_status(&self.lock(), status_id)?.and_then(|s| s.parent_id),
            None => None,
        };
        match parent {
            Some(parent_id) => self.move_task_to(task, parent_id),
            None => Ok(Some(task)),
        }
    }

    fn move_task_to(&self, task: Task, status_id: i64) -> Result<Option<Task>> {
        let mut input = CreateTaskInput::from(&task);
        input.status_id = Some(status_id);
        self.update_task(task.id, input)
    }
}
