//! `track update` - field updates, dependency edits, and status transitions.
//!
//! Write order matters: fields and edges land before the status transition,
//! so the on-`done` cascade sees dependencies added in the same command.
//! All transition rules are checked up front, before the first write.

use super::open_store;
use crate::cli::UpdateArgs;
use crate::error::{Error, Result};
use crate::model::{Status, Track, TrackPatch};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Mirror of the state machine's read-only validation, run before any
/// write so a rejected transition leaves edges and fields untouched too.
fn check_transition(store: &SqliteStorage, track: &Track, status: Status) -> Result<()> {
    if track.status == status {
        return Err(Error::NoOpTransition { status: status.as_str().to_string() });
    }
    if track.status == Status::OnHold && status == Status::InProgress {
        return Err(Error::InvalidTransition {
            from: track.status.as_str().to_string(),
            to: status.as_str().to_string(),
        });
    }
    if status.is_active() {
        let mut parent_id = track.parent_id.clone();
        while let Some(id) = parent_id {
            let parent = store
                .get_track(&id)?
                .ok_or_else(|| Error::TrackNotFound { id: id.clone() })?;
            if parent.status.is_final() {
                return Err(Error::AncestorFinal {
                    status: status.as_str().to_string(),
                    ancestor_id: parent.id,
                    ancestor_title: parent.title,
                    ancestor_status: parent.status.as_str().to_string(),
                });
            }
            parent_id = parent.parent_id;
        }
    }
    Ok(())
}

pub fn execute(args: &UpdateArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = open_store(db_path)?;
    let track = store.resolve_track(&args.track)?;

    let status = match &args.status {
        Some(value) => Status::parse(value)?,
        None => Status::InProgress,
    };
    check_transition(&store, &track, status)?;

    let patch = TrackPatch {
        title: args.title.clone(),
        summary: args.summary.clone(),
        next_prompt: args.next_prompt.clone(),
        worktree: args.worktree.as_ref().map(|tag| {
            if tag == "-" { None } else { Some(tag.clone()) }
        }),
    };
    if !patch.is_empty() {
        store.update_fields(&track.id, &patch)?;
    }

    if !args.files.is_empty() {
        store.add_files(&track.id, &args.files)?;
    }

    let mut added_blocks: Vec<String> = Vec::new();
    for target in &args.blocks {
        let target_id = store.resolve_track(target)?.id;
        store.add_edge(&track.id, &target_id)?;
        added_blocks.push(target_id);
    }

    let mut removed_blocks: Vec<String> = Vec::new();
    for target in &args.unblocks {
        // No existence check here; removing an unknown edge is a no-op.
        store.remove_edge(&track.id, target)?;
        removed_blocks.push(target.clone());
    }

    let change = store.set_status(&track.id, status)?;

    if json {
        println!("{}", serde_json::to_string(&change)?);
        return Ok(());
    }

    println!("Updated track: {}", track.id);
    println!("Status: {status}");
    if let Some(worktree) = &args.worktree {
        if worktree == "-" {
            println!("Worktree: (unset)");
        } else {
            println!("Worktree: {worktree}");
        }
    }
    if !args.files.is_empty() {
        println!("Files: {} file(s) associated", args.files.len());
    }
    if !added_blocks.is_empty() {
        println!("Now blocks: {}", added_blocks.join(", "));
    }
    if !removed_blocks.is_empty() {
        println!("No longer blocks: {}", removed_blocks.join(", "));
    }
    if !change.unblocked.is_empty() {
        println!("Unblocked tracks: {}", change.unblocked.join(", "));
    }
    if !change.superseded.is_empty() {
        println!("Superseded sub-tasks: {}", change.superseded.join(", "));
    }
    Ok(())
}
