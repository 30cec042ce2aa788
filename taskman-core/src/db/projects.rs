use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::tasks::{detach_tasks, TaskRef};
use super::{Conditions, Database};
use crate::error::{Error, Result};
use crate::lifecycle::completion_timestamp;
use crate::models::{CreateProjectInput, Page, PageRequest, Project, UpdateProjectInput};

const COLUMNS: &str = "id, name, description, is_complete, created_at, completed_at";

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_complete: row.get("is_complete")?,
        created_at: row.get("created_at")?,
        completed_at: row.get("completed_at")?,
    })
}

pub(super) fn find_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], project_from_row).optional()?)
}

impl Database {
    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        input.validate()?;
        let now = Utc::now();
        let completed_at = completion_timestamp(input.is_complete, None, now);

        let conn = self.lock();
        conn.execute(
            "INSERT INTO projects (name, description, is_complete, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![input.name, input.description, input.is_complete, now, completed_at],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(project_id = id, "Project created");

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            is_complete: input.is_complete,
            created_at: now,
            completed_at,
        })
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        find_project(&self.lock(), id)
    }

    pub fn list_projects(&self, page: PageRequest) -> Result<Page<Project>> {
        let conn = self.lock();
        let conditions = Conditions::default();
        let count = conditions.count(&conn, "projects")?;
        let sql = format!(
            "SELECT {} FROM projects{} ORDER BY id LIMIT ? OFFSET ?",
            COLUMNS,
            conditions.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(
                rusqlite::params_from_iter(conditions.paged(page)),
                project_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Page { count, results })
    }

    /// Replaces every writable field. `None` when the project does not exist.
    pub fn update_project(&self, id: i64, input: CreateProjectInput) -> Result<Option<Project>> {
        input.validate()?;
        let conn = self.lock();
        let Some(current) = find_project(&conn, id)? else {
            return Ok(None);
        };

        let completed_at = completion_timestamp(input.is_complete, current.completed_at, Utc::now());
        conn.execute(
            "UPDATE projects SET name = ?1, description = ?2, is_complete = ?3, completed_at = ?4
             WHERE id = ?5",
            params![input.name, input.description, input.is_complete, completed_at, id],
        )?;
        tracing::debug!(project_id = id, "Project saved");

        Ok(Some(Project {
            name: input.name,
            description: input.description,
            is_complete: input.is_complete,
            completed_at,
            ..current
        }))
    }

    pub fn patch_project(&self, id: i64, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(current) = self.get_project(id)? else {
            return Ok(None);
        };
        self.update_project(id, input.merge(&current))
    }

    /// Deletes a project that no sprint belongs to. Its tasks lose the
    /// reference but survive, each with an update snapshot.
    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if find_project(&tx, id)?.is_none() {
            return Ok(false);
        }
        let sprints: i64 = tx.query_row(
            "SELECT COUNT(*) FROM sprints WHERE project_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if sprints > 0 {
            return Err(Error::Protected {
                entity: "project",
                id,
                reason: format!("{} sprint(s) still belong to it", sprints),
            });
        }

        detach_tasks(&tx, TaskRef::Project, id)?;
        tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        tx.commit()?;

        tracing::info!(project_id = id, "Project deleted");
        Ok(true)
    }
}
