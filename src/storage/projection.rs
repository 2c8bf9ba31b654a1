//! Read-only composite views for renderers.
//!
//! The engine never renders; it hands the command layer a `TrackDetails`
//! per track (children ids, blocks/blocked-by ids, file paths, derived
//! kind) and lets the console/JSON/markdown renderers take it from there.

use crate::error::{Error, Result};
use crate::model::Track;
use crate::storage::sqlite::{SqliteStorage, TrackFilter};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Display label derived from tree depth: the root is the project
/// ("super"), its direct children are features, everything below is a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Super,
    Feature,
    Task,
}

impl TrackKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Super => "super",
            Self::Feature => "feature",
            Self::Task => "task",
        }
    }
}

/// A track plus everything a renderer needs alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct TrackDetails {
    #[serde(flatten)]
    pub track: Track,
    pub kind: TrackKind,
    /// Child ids within the projected set, in sibling order.
    pub children: Vec<String>,
    /// Associated file paths.
    pub files: Vec<String>,
    /// Ids this track blocks.
    pub blocks: Vec<String>,
    /// Ids blocking this track.
    pub blocked_by: Vec<String>,
}

/// Scope and visibility switches for a status report.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Restrict to one track and its descendants.
    pub track_id: Option<String>,
    /// Include final-status and archived tracks.
    pub all: bool,
    /// Restrict to one worktree tag.
    pub worktree: Option<String>,
}

fn derive_kind(track: &Track, root_id: Option<&str>) -> TrackKind {
    if track.parent_id.is_none() {
        TrackKind::Super
    } else if track.parent_id.as_deref() == root_id {
        TrackKind::Feature
    } else {
        TrackKind::Task
    }
}

/// Assemble details for a set of tracks.
///
/// `children` lists only ids present in the set, so a filtered report never
/// points a renderer at rows it does not have. The input order (sibling
/// order from the store) is preserved.
fn build_details(
    tracks: Vec<Track>,
    root_id: Option<&str>,
    files: &HashMap<String, Vec<String>>,
    edges: &[(String, String)],
) -> Vec<TrackDetails> {
    let present: HashSet<&str> = tracks.iter().map(|t| t.id.as_str()).collect();

    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for track in &tracks {
        if let Some(parent_id) = &track.parent_id {
            if present.contains(parent_id.as_str()) {
                children.entry(parent_id.clone()).or_default().push(track.id.clone());
            }
        }
    }

    let mut blocks: HashMap<&str, Vec<String>> = HashMap::new();
    let mut blocked_by: HashMap<&str, Vec<String>> = HashMap::new();
    for (blocking, blocked) in edges {
        blocks.entry(blocking.as_str()).or_default().push(blocked.clone());
        blocked_by.entry(blocked.as_str()).or_default().push(blocking.clone());
    }

    tracks
        .into_iter()
        .map(|track| {
            let kind = derive_kind(&track, root_id);
            let id = track.id.clone();
            TrackDetails {
                kind,
                children: children.remove(&id).unwrap_or_default(),
                files: files.get(&id).cloned().unwrap_or_default(),
                blocks: blocks.remove(id.as_str()).unwrap_or_default(),
                blocked_by: blocked_by.remove(id.as_str()).unwrap_or_default(),
                track,
            }
        })
        .collect()
}

impl SqliteStorage {
    /// Full details for a single track.
    ///
    /// Children here are all of the track's children, regardless of status.
    ///
    /// # Errors
    ///
    /// `TrackNotFound` if the id is absent.
    pub fn track_details(&self, id: &str) -> Result<TrackDetails> {
        let track = self
            .get_track(id)?
            .ok_or_else(|| Error::TrackNotFound { id: id.to_string() })?;
        let root_id = self.root_track()?.map(|t| t.id);

        let kind = derive_kind(&track, root_id.as_deref());
        Ok(TrackDetails {
            kind,
            children: self.children_of(id)?.into_iter().map(|t| t.id).collect(),
            files: self.files_of(id)?,
            blocks: self.dependents_of(id)?,
            blocked_by: self.blockers_of(id)?,
            track,
        })
    }

    /// Build the status report consumed by the tree/JSON/markdown renderers.
    ///
    /// Defaults to active, unarchived tracks; `all` lifts both filters.
    /// With a `track_id` scope, the report covers the track and its
    /// descendants, and the target is included even when it would not pass
    /// the status filter. In an unscoped default report the root track is
    /// prepended for context when it is itself active.
    ///
    /// # Errors
    ///
    /// `TrackNotFound` for an unknown scope id.
    pub fn status_report(&self, filter: &ReportFilter) -> Result<Vec<TrackDetails>> {
        let mut tracks = if filter.all {
            self.query_tracks(&TrackFilter::all())?
        } else {
            self.query_tracks(&TrackFilter::active())?
        };

        if let Some(ref scope_id) = filter.track_id {
            let target = self
                .get_track(scope_id)?
                .ok_or_else(|| Error::TrackNotFound { id: scope_id.clone() })?;

            let mut in_scope: HashSet<String> = HashSet::from([scope_id.clone()]);
            in_scope.extend(self.descendant_ids(scope_id)?);
            tracks.retain(|t| in_scope.contains(&t.id));

            // The target itself is shown even when filtered out.
            if !tracks.iter().any(|t| t.id == *scope_id) {
                tracks.insert(0, target);
            }
        } else {
            if let Some(ref worktree) = filter.worktree {
                tracks.retain(|t| t.worktree.as_deref() == Some(worktree));
            }

            if !filter.all {
                if let Some(root) = self.root_track()? {
                    if root.status.is_active() && !tracks.iter().any(|t| t.id == root.id) {
                        tracks.insert(0, root);
                    }
                }
            }
        }

        let root_id = self.root_track()?.map(|t| t.id);
        let files = self.all_files()?;
        let edges = self.all_dependencies()?;
        Ok(build_details(tracks, root_id.as_deref(), &files, &edges))
    }
}
