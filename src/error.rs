//! Error types for the track CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 5=graph, ...)
//! - Retryability flags for agent self-correction
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for track operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Agents match on the string; shell scripts on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,
    DuplicateId,

    // Not Found (exit 3)
    TrackNotFound,
    UnknownParent,
    AmbiguousTrack,

    // Validation (exit 4)
    InvalidStatus,
    InvalidArgument,
    NoOpTransition,
    InvalidTransition,
    AncestorFinal,
    DifferentParent,
    NotArchivable,
    AlreadyArchived,
    NotArchived,

    // Hierarchy / Dependency (exit 5)
    CycleDetected,
    SelfDependency,
    CannotDeleteRoot,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DuplicateId => "DUPLICATE_ID",
            Self::TrackNotFound => "TRACK_NOT_FOUND",
            Self::UnknownParent => "UNKNOWN_PARENT",
            Self::AmbiguousTrack => "AMBIGUOUS_TRACK",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NoOpTransition => "NO_OP_TRANSITION",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::AncestorFinal => "ANCESTOR_FINAL",
            Self::DifferentParent => "DIFFERENT_PARENT",
            Self::NotArchivable => "NOT_ARCHIVABLE",
            Self::AlreadyArchived => "ALREADY_ARCHIVED",
            Self::NotArchived => "NOT_ARCHIVED",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::SelfDependency => "SELF_DEPENDENCY",
            Self::CannotDeleteRoot => "CANNOT_DELETE_ROOT",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::DatabaseError
            | Self::DuplicateId => 2,
            Self::TrackNotFound | Self::UnknownParent | Self::AmbiguousTrack => 3,
            Self::InvalidStatus
            | Self::InvalidArgument
            | Self::NoOpTransition
            | Self::InvalidTransition
            | Self::AncestorFinal
            | Self::DifferentParent
            | Self::NotArchivable
            | Self::AlreadyArchived
            | Self::NotArchived => 4,
            Self::CycleDetected | Self::SelfDependency | Self::CannotDeleteRoot => 5,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether an agent should retry with corrected input.
    ///
    /// True for validation errors (wrong status, wrong target) and
    /// ambiguous titles. False for not-found, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidStatus
                | Self::InvalidArgument
                | Self::NoOpTransition
                | Self::InvalidTransition
                | Self::DifferentParent
                | Self::AmbiguousTrack
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in track operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No track project found in this directory")]
    NotInitialized,

    #[error("Track project already exists at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Unknown track id: {id}")]
    TrackNotFound { id: String },

    #[error("Unknown parent track: {id}")]
    UnknownParent { id: String },

    #[error("Ambiguous track: {input}")]
    AmbiguousTrack {
        input: String,
        /// (id, title) of every track matching the input.
        matches: Vec<(String, String)>,
    },

    #[error("Duplicate track id: {id}")]
    DuplicateId { id: String },

    #[error("Cannot delete the root track")]
    CannotDeleteRoot,

    #[error("Tracks must have the same parent")]
    DifferentParent { track: String, target: String },

    #[error("A track cannot block itself: {id}")]
    SelfDependency { id: String },

    #[error("Adding dependency would create a cycle: {blocking} cannot block {blocked}")]
    CycleDetected { blocking: String, blocked: String },

    #[error("Track is already '{status}'")]
    NoOpTransition { status: String },

    #[error("Cannot change status from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error(
        "Cannot set status to '{status}': ancestor '{ancestor_title}' ({ancestor_id}) is '{ancestor_status}'"
    )]
    AncestorFinal {
        status: String,
        ancestor_id: String,
        ancestor_title: String,
        ancestor_status: String,
    },

    #[error("Cannot archive track with status '{status}'")]
    NotArchivable { status: String },

    #[error("Track \"{title}\" is already archived")]
    AlreadyArchived { title: String },

    #[error("Track \"{title}\" is not archived")]
    NotArchived { title: String },

    #[error("Invalid status: {value}")]
    InvalidStatus { value: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::TrackNotFound { .. } => ErrorCode::TrackNotFound,
            Self::UnknownParent { .. } => ErrorCode::UnknownParent,
            Self::AmbiguousTrack { .. } => ErrorCode::AmbiguousTrack,
            Self::DuplicateId { .. } => ErrorCode::DuplicateId,
            Self::CannotDeleteRoot => ErrorCode::CannotDeleteRoot,
            Self::DifferentParent { .. } => ErrorCode::DifferentParent,
            Self::SelfDependency { .. } => ErrorCode::SelfDependency,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::NoOpTransition { .. } => ErrorCode::NoOpTransition,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::AncestorFinal { .. } => ErrorCode::AncestorFinal,
            Self::NotArchivable { .. } => ErrorCode::NotArchivable,
            Self::AlreadyArchived { .. } => ErrorCode::AlreadyArchived,
            Self::NotArchived { .. } => ErrorCode::NotArchived,
            Self::InvalidStatus { .. } => ErrorCode::InvalidStatus,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint for agents and humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `track init` first to initialize a project".to_string())
            }

            Self::AlreadyInitialized { .. } => Some(
                "A .track/ directory is already present. Use `--force` to overwrite.".to_string(),
            ),

            Self::TrackNotFound { .. } | Self::UnknownParent { .. } => Some(
                "Use `track status --all` to list every track and its id".to_string(),
            ),

            Self::AmbiguousTrack { matches, .. } => {
                let mut hint = String::from("Multiple tracks match that title:\n");
                for (id, title) in matches {
                    hint.push_str(&format!("    {id}  \"{title}\"\n"));
                }
                hint.push_str("  Use the track id instead.");
                Some(hint)
            }

            Self::CannotDeleteRoot => {
                Some("Use `track update` to modify the project track instead".to_string())
            }

            Self::DifferentParent { track, target } => Some(format!(
                "`track sort` only reorders siblings; {track} and {target} have different parents"
            )),

            Self::CycleDetected { .. } => Some(
                "The blocked track already reaches the blocking track through existing dependencies"
                    .to_string(),
            ),

            Self::NoOpTransition { .. } => Some("No update performed".to_string()),

            Self::InvalidTransition { from, to } if from == "on_hold" && to == "in_progress" => {
                Some(
                    "An on-hold track cannot be resumed directly. Set it back to 'planned' first."
                        .to_string(),
                )
            }

            Self::AncestorFinal { .. } => Some(
                "A sub-task cannot be active when its parent is done or superseded".to_string(),
            ),

            Self::NotArchivable { .. } => Some(
                "Only tracks with status done, on_hold, or superseded can be archived".to_string(),
            ),

            Self::InvalidStatus { .. } => Some(
                "Valid statuses: planned, in_progress, done, blocked, superseded, on_hold"
                    .to_string(),
            ),

            Self::SelfDependency { .. }
            | Self::DuplicateId { .. }
            | Self::AlreadyArchived { .. }
            | Self::NotArchived { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidArgument(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint. Agents parse this instead of stderr text.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
