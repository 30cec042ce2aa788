//! SQLite record store.
//!
//! Every write that touches a task runs in a single transaction together
//! with the history snapshot it produces.

mod history;
mod projects;
mod schema;
mod sprints;
mod statuses;
mod tasks;
mod users;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::types::Type;
use rusqlite::{Connection, ToSql};

use crate::error::{Error, Result};
use crate::lifecycle::{LogNotifier, Notifier};
use crate::models::PageRequest;

pub use schema::SCHEMA;

/// PBKDF2 iterations for newly stored password hashes.
pub const DEFAULT_PASSWORD_ROUNDS: u32 = 600_000;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    notifier: Arc<dyn Notifier>,
    password_rounds: u32,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!("Opened database at {}", path.display());
        Self::from_connection(conn)
    }

    /// Opens the database in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "taskman").ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine a home directory",
            )
        })?;
        Ok(dirs.data_dir().join("taskman.db"))
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: Arc::new(LogNotifier),
            password_rounds: DEFAULT_PASSWORD_ROUNDS,
        })
    }

    /// Replaces the channel status-change notices are sent through.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sets the PBKDF2 iteration count used when hashing new passwords.
    /// Existing hashes keep the count they were stored with.
    pub fn with_password_rounds(mut self, rounds: u32) -> Self {
        self.password_rounds = rounds.max(1);
        self
    }

    pub fn migrate(&self) -> Result<()> {
        self.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// `WHERE` clauses and their positional parameters for list queries.
#[derive(Default)]
struct Conditions {
    clauses: Vec<&'static str>,
    params: Vec<Box<dyn ToSql>>,
}

impl Conditions {
    fn push(&mut self, clause: &'static str, value: impl ToSql + 'static) {
        self.clauses.push(clause);
        self.params.push(Box::new(value));
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn count(&self, conn: &Connection, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}{}", table, self.sql());
        let count: i64 = conn.query_row(
            &sql,
            rusqlite::params_from_iter(self.params.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Appends `LIMIT ? OFFSET ?` parameters.
    fn paged(mut self, page: PageRequest) -> Vec<Box<dyn ToSql>> {
        self.params.push(Box::new(i64::from(page.limit)));
        self.params.push(Box::new(i64::from(page.offset)));
        self.params
    }
}

fn corrupt(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(Error::Corrupt(message)))
}
