//! `track new` - create a track under an existing parent.

use super::open_store;
use crate::cli::NewArgs;
use crate::config;
use crate::error::Result;
use crate::model::NewTrack;
use std::path::PathBuf;

pub fn execute(args: &NewArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;

    let parent_id = match &args.parent {
        Some(parent) => Some(store.resolve_track(parent)?.id),
        None => None,
    };

    let worktree = args.worktree.clone().or_else(config::current_worktree);

    let track = store.create_track(NewTrack {
        title: args.title.clone(),
        parent_id,
        summary: args.summary.clone(),
        next_prompt: args.next_prompt.clone(),
        worktree,
    })?;

    if !args.files.is_empty() {
        store.add_files(&track.id, &args.files)?;
    }

    let mut blocked: Vec<String> = Vec::new();
    for target in &args.blocks {
        let target_id = store.resolve_track(target)?.id;
        store.add_edge(&track.id, &target_id)?;
        blocked.push(target_id);
    }

    if json {
        println!("{}", serde_json::to_string(&store.track_details(&track.id)?)?);
        return Ok(());
    }

    println!("Created track: {}", track.title);
    println!("Track ID: {}", track.id);
    if let Some(parent_id) = &track.parent_id {
        println!("Parent: {parent_id}");
    }
    if let Some(worktree) = &track.worktree {
        println!("Worktree: {worktree}");
    }
    if !args.files.is_empty() {
        println!("Files: {} file(s) associated", args.files.len());
    }
    if !blocked.is_empty() {
        println!("Blocks: {}", blocked.join(", "));
    }
    Ok(())
}
