//! `track delete` - cascade delete with confirmation.

use super::open_store;
use crate::error::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub fn execute(input: &str, force: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;
    let track = store.resolve_track(input)?;
    let descendants = store.descendant_ids(&track.id)?;

    if !force {
        let stdout = std::io::stdout();
        if descendants.is_empty() {
            write!(stdout.lock(), "Delete track \"{}\"? [y/N] ", track.title)?;
        } else {
            write!(
                stdout.lock(),
                "Delete track \"{}\" and {} descendant(s)? [y/N] ",
                track.title,
                descendants.len()
            )?;
        }
        stdout.lock().flush()?;

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let deleted = store.delete_cascade(&track.id)?;

    if json {
        let output = serde_json::json!({ "deleted": track.id, "count": deleted });
        println!("{output}");
    } else if deleted > 1 {
        println!(
            "Deleted {deleted} tracks ({} and {} descendants)",
            track.id,
            deleted - 1
        );
    } else {
        println!("Deleted track: {}", track.id);
    }
    Ok(())
}
