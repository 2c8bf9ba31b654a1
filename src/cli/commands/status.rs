//! `track status` - render the project tree (console, JSON, or markdown).

use super::open_store;
use crate::cli::format::{
    color_kind, color_status, format_label, terminal_width, LabelOptions, TREE_BRANCH, TREE_LAST,
    TREE_PIPE, TREE_SPACE,
};
use crate::cli::StatusArgs;
use crate::config;
use crate::error::{Error, Result};
use crate::storage::{ReportFilter, TrackDetails};
use std::collections::HashMap;
use std::path::PathBuf;

pub fn execute(args: &StatusArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let store = open_store(db_path)?;

    let scope_id = match &args.track {
        Some(input) => Some(store.resolve_track(input)?.id),
        None => None,
    };

    // The worktree filter only applies to the unscoped report.
    let worktree = if scope_id.is_some() {
        None
    } else {
        match &args.worktree {
            Some(Some(name)) => Some(name.clone()),
            Some(None) => Some(config::current_worktree().ok_or_else(|| {
                Error::InvalidArgument(
                    "not in a git worktree; use --worktree <name> to filter by name".into(),
                )
            })?),
            None => None,
        }
    };

    let report = store.status_report(&ReportFilter {
        track_id: scope_id.clone(),
        all: args.all,
        worktree,
    })?;

    if json {
        println!("{}", serde_json::to_string(&serde_json::json!({ "tracks": report }))?);
    } else if args.markdown {
        print_markdown(&report, scope_id.as_deref());
    } else {
        print_tree(&report, scope_id.as_deref());
    }
    Ok(())
}

fn start_track<'a>(
    report: &'a [TrackDetails],
    scope_id: Option<&str>,
) -> Option<&'a TrackDetails> {
    match scope_id {
        Some(id) => report.iter().find(|d| d.track.id == id),
        None => report.iter().find(|d| d.track.parent_id.is_none()),
    }
}

fn print_tree(report: &[TrackDetails], scope_id: Option<&str>) {
    let Some(start) = start_track(report, scope_id) else {
        println!("No tracks found.");
        return;
    };

    let by_id: HashMap<&str, &TrackDetails> =
        report.iter().map(|d| (d.track.id.as_str(), d)).collect();
    let width = terminal_width();

    if scope_id.is_some() {
        println!("Track: {} ({})", start.track.title, start.track.id);
    } else {
        println!("Project: {} ({})", start.track.title, start.track.id);
    }
    println!();

    print_node(start, &by_id, &[], true, width);
}

fn print_node(
    details: &TrackDetails,
    by_id: &HashMap<&str, &TrackDetails>,
    prefix_parts: &[&str],
    is_last: bool,
    width: usize,
) {
    let joined = prefix_parts.concat();
    let node_prefix = format!("{joined}{} ", if is_last { TREE_LAST } else { TREE_BRANCH });
    let details_prefix = format!("{joined}{}  ", if is_last { TREE_SPACE } else { TREE_PIPE });

    let options = LabelOptions {
        label_width: 8,
        max_width: width.saturating_sub(details_prefix.chars().count()),
        continuation_indent: details_prefix.clone(),
    };

    let worktree_suffix = details
        .track
        .worktree
        .as_ref()
        .map(|name| format!(" @{name}"))
        .unwrap_or_default();
    println!(
        "{node_prefix}[{}] {} - {}{worktree_suffix}",
        color_kind(details.kind),
        details.track.id,
        details.track.title
    );

    println!("{details_prefix}{}", format_label("summary:", &details.track.summary, &options));
    println!("{details_prefix}{}", format_label("next:", &details.track.next_prompt, &options));
    println!(
        "{details_prefix}{}",
        format_label("status:", &color_status(details.track.status), &options)
    );

    if !details.files.is_empty() {
        println!(
            "{details_prefix}{}",
            format_label("files:", &details.files.join(", "), &options)
        );
    }
    if !details.blocks.is_empty() {
        println!(
            "{details_prefix}{}",
            format_label("blocks:", &details.blocks.join(", "), &options)
        );
    }
    if !details.blocked_by.is_empty() {
        println!(
            "{details_prefix}{}",
            format_label("blocked by:", &details.blocked_by.join(", "), &options)
        );
    }

    let children: Vec<&TrackDetails> = details
        .children
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .collect();
    if !children.is_empty() {
        println!();
    }

    for (index, child) in children.iter().enumerate() {
        let child_is_last = index == children.len() - 1;
        let mut child_prefix: Vec<&str> = prefix_parts.to_vec();
        child_prefix.push(if is_last { TREE_SPACE } else { TREE_PIPE });

        print_node(child, by_id, &child_prefix, child_is_last, width);
        if !child_is_last {
            println!();
        }
    }
}

fn print_markdown(report: &[TrackDetails], scope_id: Option<&str>) {
    let Some(start) = start_track(report, scope_id) else {
        println!("No tracks found.");
        return;
    };

    let by_id: HashMap<&str, &TrackDetails> =
        report.iter().map(|d| (d.track.id.as_str(), d)).collect();

    println!("# {} (`{}`)", start.track.title, start.track.id);
    println!();
    markdown_node(start, &by_id, 0);
}

fn markdown_node(details: &TrackDetails, by_id: &HashMap<&str, &TrackDetails>, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}- **{}** (`{}`) - {}",
        details.track.title, details.track.id, details.track.status
    );
    if !details.track.summary.is_empty() {
        println!("{indent}  - summary: {}", details.track.summary);
    }
    if !details.track.next_prompt.is_empty() {
        println!("{indent}  - next: {}", details.track.next_prompt);
    }
    if !details.blocked_by.is_empty() {
        println!("{indent}  - blocked by: {}", details.blocked_by.join(", "));
    }

    for child_id in &details.children {
        if let Some(child) = by_id.get(child_id.as_str()) {
            markdown_node(child, by_id, depth + 1);
        }
    }
}
