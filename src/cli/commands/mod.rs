//! Command implementations.

pub mod archive;
pub mod completions;
pub mod delete;
pub mod init;
pub mod new;
pub mod show;
pub mod sort;
pub mod status;
pub mod update;

use crate::config;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Open the project store.
///
/// An explicit `--db`/`TRACK_DB` path wins; otherwise the project's
/// `.track/` marker directory must exist.
pub(crate) fn open_store(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    if let Some(path) = db_path {
        return SqliteStorage::open(path);
    }
    if !config::project_exists() {
        return Err(Error::NotInitialized);
    }
    SqliteStorage::open(&config::db_path())
}
