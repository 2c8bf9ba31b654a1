//! Track model.
//!
//! A track is one unit of work in the project hierarchy: the root track is
//! the project itself, its children are features, everything below that is
//! a task. Status is a closed enum so the state machine's cascade branches
//! are checked exhaustively by the compiler.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Track status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Planned,
    InProgress,
    Done,
    Blocked,
    Superseded,
    OnHold,
}

impl Status {
    /// Statuses shown by default views; the complement of the final set.
    pub const ACTIVE: [Status; 4] = [
        Status::Planned,
        Status::InProgress,
        Status::Blocked,
        Status::OnHold,
    ];

    /// Terminal statuses; tracks under a final ancestor cannot go active.
    pub const FINAL: [Status; 2] = [Status::Done, Status::Superseded];

    /// Statuses that permit archiving.
    pub const ARCHIVABLE: [Status; 3] = [Status::Done, Status::OnHold, Status::Superseded];

    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Superseded => "superseded",
            Self::OnHold => "on_hold",
        }
    }

    /// Parse from the stored/CLI string form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` for anything outside the six known values;
    /// the error's hint lists them for agent retry.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "planned" => Ok(Self::Planned),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            "superseded" => Ok(Self::Superseded),
            "on_hold" => Ok(Self::OnHold),
            other => Err(Error::InvalidStatus { value: other.to_string() }),
        }
    }

    /// Whether this status is terminal (`done` or `superseded`).
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Done | Self::Superseded)
    }

    /// Whether this status counts as active for default views.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_final()
    }

    /// Whether a track in this status may be archived.
    #[must_use]
    pub const fn is_archivable(&self) -> bool {
        matches!(self, Self::Done | Self::OnHold | Self::Superseded)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A track row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// 8-character alphanumeric id, immutable.
    pub id: String,

    /// Non-empty display title.
    pub title: String,

    /// Parent track id; `None` only for the root track.
    pub parent_id: Option<String>,

    /// Current-state description.
    pub summary: String,

    /// Next-action description.
    pub next_prompt: String,

    /// Lifecycle status.
    pub status: Status,

    /// Git worktree tag, used only for filtering.
    pub worktree: Option<String>,

    /// Ordering among siblings; ties break on `created_at` then id.
    pub sort_order: i64,

    /// Hidden from default views when set.
    pub archived: bool,

    /// Creation timestamp (Unix milliseconds).
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds).
    pub updated_at: i64,

    /// Stamped on transition into `done` or `superseded`.
    pub completed_at: Option<i64>,
}

impl Track {
    /// Whether this is the root (project) track.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Parameters for creating a track.
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub title: String,
    pub parent_id: Option<String>,
    pub summary: String,
    pub next_prompt: String,
    pub worktree: Option<String>,
}

/// Partial field update for a track.
///
/// `None` leaves a field untouched. `worktree` is doubly optional:
/// `Some(None)` unsets the tag, `Some(Some(name))` replaces it.
#[derive(Debug, Clone, Default)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub next_prompt: Option<String>,
    pub worktree: Option<Option<String>>,
}

impl TrackPatch {
    /// Whether the patch changes anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.summary.is_none()
            && self.next_prompt.is_none()
            && self.worktree.is_none()
    }
}
