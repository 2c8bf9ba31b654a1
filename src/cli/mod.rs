//! CLI definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

pub mod commands;
pub mod format;

/// Hierarchical work tracking for AI coding agents
#[derive(Parser, Debug)]
#[command(name = "track", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: .track/track.db at the project root)
    #[arg(long, global = true, env = "TRACK_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON (for agent integration)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new track project in the current directory
    Init {
        /// Project name (defaults to the detected package/directory name)
        name: Option<String>,

        /// Overwrite an existing .track directory
        #[arg(short = 'F', long)]
        force: bool,
    },

    /// Create a new track
    New(NewArgs),

    /// Update the current state of an existing track
    Update(UpdateArgs),

    /// Display the project tree, a specific track, or all tracks
    Status(StatusArgs),

    /// Display details for a specific track
    Show {
        /// Track id or title
        track: String,
    },

    /// Move a track before or after a sibling
    Sort {
        /// Track id or title to move
        track: String,

        /// Where to place the track relative to the target
        #[arg(value_enum)]
        position: SortPosition,

        /// Target track id or title
        target: String,
    },

    /// Delete a track and all its children
    Delete {
        /// Track id or title
        track: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Archive a track (hide it from default views)
    Archive {
        /// Track id or title
        track: String,
    },

    /// Restore an archived track
    Unarchive {
        /// Track id or title
        track: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Position argument for `track sort`.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SortPosition {
    Before,
    After,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Track title
    pub title: String,

    /// Parent track id or title
    #[arg(long)]
    pub parent: Option<String>,

    /// Current state description
    #[arg(long, default_value = "")]
    pub summary: String,

    /// What to do next
    #[arg(long = "next", default_value = "")]
    pub next_prompt: String,

    /// Associated file path (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Git worktree name (auto-detected if omitted)
    #[arg(long)]
    pub worktree: Option<String>,

    /// Track id this will block (repeatable)
    #[arg(long = "blocks")]
    pub blocks: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Track id or title to update
    pub track: String,

    /// New title for the track
    #[arg(long)]
    pub title: Option<String>,

    /// Updated state description (kept if omitted)
    #[arg(long)]
    pub summary: Option<String>,

    /// What to do next (kept if omitted)
    #[arg(long = "next")]
    pub next_prompt: Option<String>,

    /// Track status (planned|in_progress|done|blocked|superseded|on_hold)
    #[arg(long)]
    pub status: Option<String>,

    /// Associated file path (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Git worktree name (use "-" to unset)
    #[arg(long)]
    pub worktree: Option<String>,

    /// Add dependency: this track blocks the given track (repeatable)
    #[arg(long = "blocks")]
    pub blocks: Vec<String>,

    /// Remove dependency on the given track (repeatable)
    #[arg(long = "unblocks")]
    pub unblocks: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Track id or title to scope the report to (with descendants)
    pub track: Option<String>,

    /// Output as Markdown
    #[arg(short, long)]
    pub markdown: bool,

    /// Show all tracks including done, superseded, and archived
    #[arg(short, long)]
    pub all: bool,

    /// Filter to a worktree (current one if no name given)
    #[arg(short, long, num_args = 0..=1)]
    pub worktree: Option<Option<String>>,
}
