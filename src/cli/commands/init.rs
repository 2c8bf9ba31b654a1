//! `track init` - create the project database and root track.

use crate::config;
use crate::error::{Error, Result};
use crate::model::NewTrack;
use crate::storage::SqliteStorage;

pub fn execute(name: Option<&str>, force: bool, json: bool) -> Result<()> {
    let dir = config::track_dir();
    if config::project_exists() {
        if force {
            std::fs::remove_dir_all(&dir)?;
        } else {
            return Err(Error::AlreadyInitialized { path: dir });
        }
    }
    std::fs::create_dir_all(&dir)?;

    let project_name = match name {
        Some(given) => given.to_string(),
        None => config::detect_project_name(&config::project_root()),
    };

    let mut store = SqliteStorage::open(&config::db_path())?;
    let root = store.create_track(NewTrack {
        title: project_name.clone(),
        ..NewTrack::default()
    })?;

    if json {
        let output = serde_json::json!({
            "id": root.id,
            "title": root.title,
            "database": format!("{}/{}", config::TRACK_DIR, config::DB_FILE),
        });
        println!("{output}");
    } else {
        println!("Initialized track project: {project_name}");
        println!("Project ID: {}", root.id);
        println!("Database: {}/{}", config::TRACK_DIR, config::DB_FILE);
    }
    Ok(())
}
