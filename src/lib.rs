pub mod api;
pub mod config;
pub mod web;

pub use taskman_core::{db, history, lifecycle, models, status_tree};
