//! `track show` - details for one track.

use super::open_store;
use crate::cli::format::{color_kind, color_status, format_label, LabelOptions};
use crate::error::Result;
use std::path::PathBuf;

pub fn execute(input: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let store = open_store(db_path)?;
    let track = store.resolve_track(input)?;
    let details = store.track_details(&track.id)?;

    if json {
        println!("{}", serde_json::to_string(&details)?);
        return Ok(());
    }

    let options = LabelOptions { label_width: 11, ..LabelOptions::default() };
    println!(
        "[{}] {} - {}",
        color_kind(details.kind),
        details.track.id,
        details.track.title
    );
    println!("  {}", format_label("status:", &color_status(details.track.status), &options));
    println!("  {}", format_label("summary:", &details.track.summary, &options));
    println!("  {}", format_label("next:", &details.track.next_prompt, &options));
    if let Some(worktree) = &details.track.worktree {
        println!("  {}", format_label("worktree:", worktree, &options));
    }
    if details.track.archived {
        println!("  {}", format_label("archived:", "yes", &options));
    }
    if !details.files.is_empty() {
        println!("  {}", format_label("files:", &details.files.join(", "), &options));
    }
    if !details.blocks.is_empty() {
        println!("  {}", format_label("blocks:", &details.blocks.join(", "), &options));
    }
    if !details.blocked_by.is_empty() {
        println!(
            "  {}",
            format_label("blocked by:", &details.blocked_by.join(", "), &options)
        );
    }
    if !details.children.is_empty() {
        println!(
            "  {}",
            format_label("children:", &details.children.join(", "), &options)
        );
    }
    Ok(())
}
