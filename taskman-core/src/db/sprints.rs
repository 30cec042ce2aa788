use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::projects::find_project;
use super::tasks::{detach_tasks, TaskRef};
use super::{Conditions, Database};
use crate::error::{Result, ValidationError};
use crate::models::{CreateSprintInput, Page, PageRequest, Sprint, SprintFilter, UpdateSprintInput};

const COLUMNS: &str = "id, name, date_start, date_end, project_id";

fn sprint_from_row(row: &Row) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: row.get("id")?,
        name: row.get("name")?,
        date_start: row.get("date_start")?,
        date_end: row.get("date_end")?,
        project_id: row.get("project_id")?,
    })
}

pub(super) fn find_sprint(conn: &Connection, id: i64) -> Result<Option<Sprint>> {
    let sql = format!("SELECT {} FROM sprints WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], sprint_from_row).optional()?)
}

fn check_project(conn: &Connection, input: &CreateSprintInput) -> Result<()> {
    if find_project(conn, input.project_id)?.is_none() {
        return Err(ValidationError::single(
            "project_id",
            format!("project {} does not exist", input.project_id),
        )
        .into());
    }
    Ok(())
}

impl Database {
    pub fn create_sprint(&self, input: CreateSprintInput) -> Result<Sprint> {
        input.validate()?;
        let conn = self.lock();
        check_project(&conn, &input)?;

        conn.execute(
            "INSERT INTO sprints (name, date_start, date_end, project_id) VALUES (?1, ?2, ?3, ?4)",
            params![input.name, input.date_start, input.date_end, input.project_id],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(sprint_id = id, project_id = input.project_id, "Sprint created");

        Ok(Sprint {
            id,
            name: input.name,
            date_start: input.date_start,
            date_end: input.date_end,
            project_id: input.project_id,
        })
    }

    pub fn get_sprint(&self, id: i64) -> Result<Option<Sprint>> {
        find_sprint(&self.lock(), id)
    }

    pub fn list_sprints(&self, filter: &SprintFilter, page: PageRequest) -> Result<Page<Sprint>> {
        let mut conditions = Conditions::default();
        if let Some(project_id) = filter.project_id {
            conditions.push("project_id = ?", project_id);
        }
        if let Some(day) = filter.active_on {
            conditions.push("date_start <= ?", day);
            conditions.push("date_end >= ?", day);
        }

        let conn = self.lock();
        let count = conditions.count(&conn, "sprints")?;
        let sql = format!(
            "SELECT {} FROM sprints{} ORDER BY id LIMIT ? OFFSET ?",
            COLUMNS,
            conditions.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(
                rusqlite::params_from_iter(conditions.paged(page)),
                sprint_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Page { count, results })
    }

    /// Sprints running on `day` that still hold at least one open task.
    pub fn active_sprints_with_open_tasks(&self, day: NaiveDate) -> Result<Vec<Sprint>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT s.id, s.name, s.date_start, s.date_end, s.project_id
             FROM sprints s
             JOIN tasks t ON t.sprint_id = s.id
             WHERE s.date_start <= ?1 AND s.date_end >= ?1 AND t.is_complete = 0
             ORDER BY s.id",
        )?;
        let sprints = stmt
            .query_map([day], sprint_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sprints)
    }

    pub fn update_sprint(&self, id: i64, input: CreateSprintInput) -> Result<Option<Sprint>> {
        input.validate()?;
        let conn = self.lock();
        if find_sprint(&conn, id)?.is_none() {
            return Ok(None);
        }
        check_project(&conn, &input)?;

        conn.execute(
            "UPDATE sprints SET name = ?1, date_start = ?2, date_end = ?3, project_id = ?4
             WHERE id = ?5",
            params![input.name, input.date_start, input.date_end, input.project_id, id],
        )?;
        tracing::debug!(sprint_id = id, "Sprint saved");

        Ok(Some(Sprint {
            id,
            name: input.name,
            date_start: input.date_start,
            date_end: input.date_end,
            project_id: input.project_id,
        }))
    }

    pub fn patch_sprint(&self, id: i64, input: UpdateSprintInput) -> Result<Option<Sprint>> {
        let Some(current) = self.get_sprint(id)? else {
            return Ok(None);
        };
        self.update_sprint(id, input.merge(&current))
    }

    /// Tasks in the sprint keep existing without it. Each detached task
    /// gets an update snapshot.
    pub fn delete_sprint(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if find_sprint(&tx, id)?.is_none() {
            return Ok(false);
        }
        detach_tasks(&tx, TaskRef::Sprint, id)?;
        tx.execute("DELETE FROM sprints WHERE id = ?1", [id])?;
        tx.commit()?;

        tracing::info!(sprint_id = id, "Sprint deleted");
        Ok(true)
    }
}
