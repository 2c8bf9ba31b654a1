//! `track archive` / `track unarchive`.

use super::open_store;
use crate::error::Result;
use std::path::PathBuf;

pub fn execute(input: &str, archived: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;
    let track = store.resolve_track(input)?;
    let track = store.set_archived(&track.id, archived)?;

    if json {
        let output = serde_json::json!({ "id": track.id, "archived": track.archived });
        println!("{output}");
    } else if archived {
        println!("Archived: {}", track.title);
    } else {
        println!("Unarchived: {}", track.title);
    }
    Ok(())
}
