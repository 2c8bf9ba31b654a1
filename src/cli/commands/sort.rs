//! `track sort` - reorder a track among its siblings.

use super::open_store;
use crate::cli::SortPosition;
use crate::error::Result;
use crate::storage::Position;
use std::path::PathBuf;

pub fn execute(
    track: &str,
    position: SortPosition,
    target: &str,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut store = open_store(db_path)?;
    let track = store.resolve_track(track)?;
    let target = store.resolve_track(target)?;

    let (position, label) = match position {
        SortPosition::Before => (Position::Before, "before"),
        SortPosition::After => (Position::After, "after"),
    };
    store.move_relative(&track.id, &target.id, position)?;

    if json {
        let output = serde_json::json!({
            "moved": track.id,
            "position": label,
            "target": target.id,
        });
        println!("{output}");
    } else {
        println!("Moved \"{}\" {label} \"{}\"", track.title, target.title);
    }
    Ok(())
}
