//! Core library for taskman.
//!
//! This crate provides the domain models, the status tree, task history
//! narration and the SQLite record store, independent of any transport
//! layer.
//!
//! # Usage
//!
//! ```no_run
//! use taskman_core::history::render_history;
//! use taskman_core::models::CreateTaskInput;
//! use taskman_core::Database;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let task = db.create_task(CreateTaskInput::new("Release", "Cut 1.0"))?;
//! let entries = render_history(&db.task_history_window(task.id, 100)?);
//! assert_eq!(entries.len(), 1);
//! # Ok::<(), taskman_core::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod models;
pub mod status_tree;
mod validation;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::{Error, Result, ValidationError};
