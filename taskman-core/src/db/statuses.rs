use rusqlite::{params, Connection, OptionalExtension, Row};

use super::tasks::{detach_tasks, TaskRef};
use super::{Conditions, Database};
use crate::error::{Error, Result, ValidationError};
use crate::models::{
    CreateStatusInput, Page, PageRequest, Status, StatusFilter, StatusTreeEntry, UpdateStatusInput,
};
use crate::status_tree::{self, StatusTree};

const COLUMNS: &str = "id, name, parent_id";

fn status_from_row(row: &Row) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
    })
}

pub(super) fn find_status(conn: &Connection, id: i64) -> Result<Option<Status>> {
    let sql = format!("SELECT {} FROM statuses WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], status_from_row).optional()?)
}

fn all_statuses(conn: &Connection) -> Result<Vec<Status>> {
    let sql = format!("SELECT {} FROM statuses ORDER BY id", COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let statuses = stmt
        .query_map([], status_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(statuses)
}

/// First child of `parent` by id. With no parent, the first root.
pub(super) fn first_child(conn: &Connection, parent: Option<i64>) -> Result<Option<Status>> {
    let sql = format!(
        "SELECT {} FROM statuses WHERE parent_id IS ?1 ORDER BY id LIMIT 1",
        COLUMNS
    );
    Ok(conn.query_row(&sql, [parent], status_from_row).optional()?)
}

fn missing_parent(parent_id: i64) -> Error {
    ValidationError::single("parent_id", format!("status {} does not exist", parent_id)).into()
}

impl Database {
    pub fn create_status(&self, input: CreateStatusInput) -> Result<Status> {
        input.validate()?;
        let conn = self.lock();
        if let Some(parent_id) = input.parent_id {
            if find_status(&conn, parent_id)?.is_none() {
                return Err(missing_parent(parent_id));
            }
        }

        conn.execute(
            "INSERT INTO statuses (name, parent_id) VALUES (?1, ?2)",
            params![input.name, input.parent_id],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(status_id = id, parent_id = ?input.parent_id, "Status created");

        Ok(Status {
            id,
            name: input.name,
            parent_id: input.parent_id,
        })
    }

    pub fn get_status(&self, id: i64) -> Result<Option<Status>> {
        find_status(&self.lock(), id)
    }

    pub fn list_statuses(&self, filter: &StatusFilter, page: PageRequest) -> Result<Page<Status>> {
        let mut conditions = Conditions::default();
        if let Some(parent_id) = filter.parent_id {
            conditions.push("parent_id IS ?", parent_id);
        }

        let conn = self.lock();
        let count = conditions.count(&conn, "statuses")?;
        let sql = format!(
            "SELECT {} FROM statuses{} ORDER BY id LIMIT ? OFFSET ?",
            COLUMNS,
            conditions.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(
                rusqlite::params_from_iter(conditions.paged(page)),
                status_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Page { count, results })
    }

    /// Every status grouped by tree, trees ordered by root id.
    pub fn status_tree(&self) -> Result<Vec<StatusTreeEntry>> {
        let statuses = all_statuses(&self.lock())?;
        status_tree::ordered_entries(&statuses)
    }

    /// Rejects a parent that does not exist or whose chain leads back to the
    /// status itself.
    pub fn update_status(&self, id: i64, input: CreateStatusInput) -> Result<Option<Status>> {
        input.validate()?;
        let conn = self.lock();
        if find_status(&conn, id)?.is_none() {
            return Ok(None);
        }
        if let Some(parent_id) = input.parent_id {
            let statuses = all_statuses(&conn)?;
            match StatusTree::new(&statuses).check_parent(id, parent_id) {
                Err(Error::NotFound { .. }) => return Err(missing_parent(parent_id)),
                other => other?,
            }
        }

        conn.execute(
            "UPDATE statuses SET name = ?1, parent_id = ?2 WHERE id = ?3",
            params![input.name, input.parent_id, id],
        )?;
        tracing::debug!(status_id = id, parent_id = ?input.parent_id, "Status saved");

        Ok(Some(Status {
            id,
            name: input.name,
            parent_id: input.parent_id,
        }))
    }

    pub fn patch_status(&self, id: i64, input: UpdateStatusInput) -> Result<Option<Status>> {
        let Some(current) = self.get_status(id)? else {
            return Ok(None);
        };
        self.update_status(id, input.merge(&current))
    }

    /// Children become roots and tasks lose the status. Each detached task
    /// gets an update snapshot.
    pub fn delete_status(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if find_status(&tx, id)?.is_none() {
            return Ok(false);
        }
        detach_tasks(&tx, TaskRef::Status, id)?;
        tx.execute("DELETE FROM statuses WHERE id = ?1", [id])?;
        tx.commit()?;

        tracing::info!(status_id = id, "Status deleted");
        Ok(true)
    }
}
