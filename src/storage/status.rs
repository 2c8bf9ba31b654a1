//! Status state machine.
//!
//! There is no single transition table: each rule inspects the current
//! status, the ancestor chain, or the dependency set. The cascades a
//! transition triggers run inside the same transaction as the triggering
//! update, so a failure halfway through a cascade rolls everything back.

use crate::error::{Error, Result};
use crate::model::{Status, Track, TrackPatch};
use crate::storage::graph::{all_blockers_done_conn, dependents_of_conn};
use crate::storage::hierarchy::descendant_ids_tx;
use crate::storage::sqlite::{add_files_tx, get_track_tx, require_track_tx, SqliteStorage};
use rusqlite::Transaction;
use serde::Serialize;
use tracing::debug;

/// `next_prompt` written onto descendants force-superseded by a parent
/// completing.
pub const SUPERSEDED_NEXT_PROMPT: &str = "Parent marked done - task superseded";

/// Outcome of a status transition, cascades included.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    /// The track after the transition.
    pub track: Track,
    /// Tracks auto-unblocked because all their blockers are now done.
    pub unblocked: Vec<String>,
    /// Descendants auto-superseded by this track completing.
    pub superseded: Vec<String>,
}

/// Write a bare status change (status + `updated_at`); no cascade logic.
pub(crate) fn write_status_tx(tx: &Transaction<'_>, id: &str, status: Status) -> Result<()> {
    tx.execute(
        "UPDATE tracks SET status = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![status, chrono::Utc::now().timestamp_millis(), id],
    )?;
    Ok(())
}

/// Reject a non-final target when any ancestor is `done` or `superseded`.
fn check_ancestors_tx(tx: &Transaction<'_>, track: &Track, target: Status) -> Result<()> {
    let mut parent_id = track.parent_id.clone();
    while let Some(id) = parent_id {
        let parent = require_track_tx(tx, &id)?;
        if parent.status.is_final() {
            return Err(Error::AncestorFinal {
                status: target.as_str().to_string(),
                ancestor_id: parent.id,
                ancestor_title: parent.title,
                ancestor_status: parent.status.as_str().to_string(),
            });
        }
        parent_id = parent.parent_id;
    }
    Ok(())
}

impl SqliteStorage {
    /// Apply a status transition with its cascades.
    ///
    /// Validation order matches the transition rules: same-status calls are
    /// rejected, `on_hold` cannot resume to `in_progress`, and a non-final
    /// target is rejected while any ancestor is final. Transitions into
    /// `done`/`superseded` stamp `completed_at`. Marking a track `done`
    /// additionally (a) re-plans every blocked dependent whose blockers are
    /// now all done and (b) force-supersedes every still-active descendant
    /// (which is the mechanism behind the ancestor-final rule, so the
    /// cascade itself skips that check).
    ///
    /// # Errors
    ///
    /// `TrackNotFound`, `NoOpTransition`, `InvalidTransition`,
    /// `AncestorFinal`, or a storage error (rolled back).
    pub fn set_status(&mut self, id: &str, status: Status) -> Result<StatusChange> {
        self.mutate("set_status", |tx, log| {
            let track = require_track_tx(tx, id)?;

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
                check_ancestors_tx(tx, &track, status)?;
            }

            let now = chrono::Utc::now().timestamp_millis();
            if status.is_final() {
                tx.execute(
                    "UPDATE tracks SET status = ?1, updated_at = ?2, completed_at = ?2
                     WHERE id = ?3",
                    rusqlite::params![status, now, id],
                )?;
            } else {
                tx.execute(
                    "UPDATE tracks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![status, now, id],
                )?;
            }

            if status == Status::Done {
                // Auto-unblock: dependents whose blockers are all done.
                for dependent_id in dependents_of_conn(tx, id)? {
                    let Some(dependent) = get_track_tx(tx, &dependent_id)? else {
                        continue;
                    };
                    if dependent.status == Status::Blocked
                        && all_blockers_done_conn(tx, &dependent_id)?
                    {
                        write_status_tx(tx, &dependent_id, Status::Planned)?;
                        log.record_unblocked(&dependent_id);
                    }
                }

                // Auto-supersede: still-active descendants of a done parent.
                for descendant_id in descendant_ids_tx(tx, id)? {
                    let descendant = require_track_tx(tx, &descendant_id)?;
                    if descendant.status.is_active() {
                        tx.execute(
                            "UPDATE tracks SET status = ?1, next_prompt = ?2,
                                    updated_at = ?3, completed_at = ?3
                             WHERE id = ?4",
                            rusqlite::params![
                                Status::Superseded,
                                SUPERSEDED_NEXT_PROMPT,
                                now,
                                descendant_id
                            ],
                        )?;
                        log.record_superseded(&descendant_id);
                    }
                }
            }

            debug!(id, status = status.as_str(), "status transition applied");

            Ok(StatusChange {
                track: require_track_tx(tx, id)?,
                unblocked: log.unblocked.clone(),
                superseded: log.superseded.clone(),
            })
        })
    }

    /// Update free-text fields and the worktree tag. Never cascades.
    ///
    /// # Errors
    ///
    /// `TrackNotFound` if absent; `InvalidArgument` for an empty title.
    pub fn update_fields(&mut self, id: &str, patch: &TrackPatch) -> Result<Track> {
        self.mutate("update_fields", |tx, _log| {
            let track = require_track_tx(tx, id)?;
            if patch.is_empty() {
                return Ok(track);
            }

            let title = match &patch.title {
                Some(new_title) => {
                    let trimmed = new_title.trim();
                    if trimmed.is_empty() {
                        return Err(Error::InvalidArgument("track title cannot be empty".into()));
                    }
                    trimmed.to_string()
                }
                None => track.title,
            };
            let summary = patch.summary.clone().unwrap_or(track.summary);
            let next_prompt = patch.next_prompt.clone().unwrap_or(track.next_prompt);
            let worktree = match &patch.worktree {
                Some(new_tag) => new_tag.clone(),
                None => track.worktree,
            };

            tx.execute(
                "UPDATE tracks SET title = ?1, summary = ?2, next_prompt = ?3,
                        worktree = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    title,
                    summary,
                    next_prompt,
                    worktree,
                    chrono::Utc::now().timestamp_millis(),
                    id
                ],
            )?;

            require_track_tx(tx, id)
        })
    }

    /// Associate file paths with a track. Duplicates are ignored; never
    /// cascades.
    ///
    /// # Errors
    ///
    /// `TrackNotFound` if the track is absent.
    pub fn add_files(&mut self, id: &str, paths: &[String]) -> Result<()> {
        self.mutate("add_files", |tx, _log| {
            require_track_tx(tx, id)?;
            add_files_tx(tx, id, paths)
        })
    }

    /// Archive or unarchive a track.
    ///
    /// Archiving requires an archivable status (`done`, `on_hold`,
    /// `superseded`); unarchiving has no status precondition. The flag is
    /// flat: descendants are not touched.
    ///
    /// # Errors
    ///
    /// `TrackNotFound`, `AlreadyArchived`, `NotArchivable`, `NotArchived`.
    pub fn set_archived(&mut self, id: &str, archived: bool) -> Result<Track> {
        self.mutate("set_archived", |tx, _log| {
            let track = require_track_tx(tx, id)?;

            if archived {
                if track.archived {
                    return Err(Error::AlreadyArchived { title: track.title });
                }
                if !track.status.is_archivable() {
                    return Err(Error::NotArchivable {
                        status: track.status.as_str().to_string(),
                    });
                }
            } else if !track.archived {
                return Err(Error::NotArchived { title: track.title });
            }

            tx.execute(
                "UPDATE tracks SET archived = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![
                    i64::from(archived),
                    chrono::Utc::now().timestamp_millis(),
                    id
                ],
            )?;

            require_track_tx(tx, id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTrack;

    fn store_with_root() -> (SqliteStorage, Track) {
        let mut store = SqliteStorage::open_memory().unwrap();
        let root = store
            .create_track(NewTrack { title: "Project".into(), ..NewTrack::default() })
            .unwrap();
        (store, root)
    }

    fn new_child(store: &mut SqliteStorage, parent: &str, title: &str) -> Track {
        store
            .create_track(NewTrack {
                title: title.into(),
                parent_id: Some(parent.to_string()),
                ..NewTrack::default()
            })
            .unwrap()
    }

    #[test]
    fn test_same_status_rejected() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        assert!(matches!(
            store.set_status(&a.id, Status::Planned),
            Err(Error::NoOpTransition { .. })
        ));
    }

    #[test]
    fn test_on_hold_cannot_resume_directly() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        store.set_status(&a.id, Status::OnHold).unwrap();

        assert!(matches!(
            store.set_status(&a.id, Status::InProgress),
            Err(Error::InvalidTransition { .. })
        ));

        // The sanctioned path: back to planned, then started.
        store.set_status(&a.id, Status::Planned).unwrap();
        store.set_status(&a.id, Status::InProgress).unwrap();
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::InProgress);
    }

    #[test]
    fn test_done_stamps_completed_at() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        assert!(a.completed_at.is_none());

        let change = store.set_status(&a.id, Status::Done).unwrap();
        assert_eq!(change.track.status, Status::Done);
        assert!(change.track.completed_at.is_some());
    }

    #[test]
    fn test_non_final_under_final_ancestor_rejected() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        let a1 = new_child(&mut store, &a.id, "A1");
        let a11 = new_child(&mut store, &a1.id, "A11");
        store.set_status(&a.id, Status::Done).unwrap();

        // The cascade superseded the whole subtree; reviving any of it
        // under a done grandparent must fail and leave the row unchanged.
        let err = store.set_status(&a11.id, Status::Planned).unwrap_err();
        assert!(matches!(err, Error::AncestorFinal { .. }));
        assert_eq!(
            store.get_track(&a11.id).unwrap().unwrap().status,
            Status::Superseded
        );

        // Final statuses stay reachable below a final ancestor.
        store.set_status(&a11.id, Status::Done).unwrap();
    }

    #[test]
    fn test_done_supersedes_active_descendants() {
        let (mut store, root) = store_with_root();
        let parent = new_child(&mut store, &root.id, "Parent");
        let child = new_child(&mut store, &parent.id, "Child");
        let grandchild = new_child(&mut store, &child.id, "Grandchild");
        let finished = new_child(&mut store, &parent.id, "Finished");
        store.set_status(&grandchild.id, Status::OnHold).unwrap();
        store.set_status(&finished.id, Status::Done).unwrap();

        let change = store.set_status(&parent.id, Status::Done).unwrap();

        let mut superseded = change.superseded.clone();
        superseded.sort();
        let mut expected = vec![child.id.clone(), grandchild.id.clone()];
        expected.sort();
        assert_eq!(superseded, expected);

        for id in [&child.id, &grandchild.id] {
            let track = store.get_track(id).unwrap().unwrap();
            assert_eq!(track.status, Status::Superseded);
            assert_eq!(track.next_prompt, SUPERSEDED_NEXT_PROMPT);
            assert!(track.completed_at.is_some());
        }

        // Already-done descendants are left alone.
        let track = store.get_track(&finished.id).unwrap().unwrap();
        assert_eq!(track.status, Status::Done);
        assert_ne!(track.next_prompt, SUPERSEDED_NEXT_PROMPT);
    }

    #[test]
    fn test_done_unblocks_dependents_when_all_blockers_done() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        let b = new_child(&mut store, &root.id, "B");
        let c = new_child(&mut store, &root.id, "C");

        store.add_edge(&b.id, &a.id).unwrap();
        store.add_edge(&c.id, &a.id).unwrap();
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Blocked);

        let change = store.set_status(&b.id, Status::Done).unwrap();
        assert!(change.unblocked.is_empty());
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Blocked);

        let change = store.set_status(&c.id, Status::Done).unwrap();
        assert_eq!(change.unblocked, vec![a.id.clone()]);
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Planned);
    }

    #[test]
    fn test_block_then_unblock_round_trip() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        let b = new_child(&mut store, &root.id, "B");

        store.add_edge(&b.id, &a.id).unwrap();
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Blocked);

        let change = store.set_status(&b.id, Status::Done).unwrap();
        assert_eq!(change.unblocked, vec![a.id.clone()]);
        assert!(change.track.completed_at.is_some());
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Planned);
    }

    #[test]
    fn test_manually_blocked_track_is_not_unblocked_by_done() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        let b = new_child(&mut store, &root.id, "B");
        store.set_status(&a.id, Status::Blocked).unwrap();
        store.set_status(&b.id, Status::InProgress).unwrap();

        // B blocks nothing; A has no dependency records, so completing B
        // cannot re-plan it.
        store.set_status(&b.id, Status::Done).unwrap();
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Blocked);
    }

    #[test]
    fn test_update_fields_never_cascades() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        let b = new_child(&mut store, &root.id, "B");
        store.add_edge(&b.id, &a.id).unwrap();

        let updated = store
            .update_fields(
                &b.id,
                &TrackPatch {
                    title: Some("B renamed".into()),
                    summary: Some("halfway".into()),
                    next_prompt: Some("wire the API".into()),
                    worktree: Some(Some("api".into())),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "B renamed");
        assert_eq!(updated.summary, "halfway");
        assert_eq!(updated.worktree.as_deref(), Some("api"));
        assert_eq!(store.get_track(&a.id).unwrap().unwrap().status, Status::Blocked);

        // `Some(None)` unsets the tag.
        let updated = store
            .update_fields(&b.id, &TrackPatch { worktree: Some(None), ..TrackPatch::default() })
            .unwrap();
        assert!(updated.worktree.is_none());
    }

    #[test]
    fn test_add_files_dedupes() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        store
            .add_files(&a.id, &["src/main.rs".into(), "src/lib.rs".into()])
            .unwrap();
        store.add_files(&a.id, &["src/main.rs".into()]).unwrap();
        assert_eq!(
            store.files_of(&a.id).unwrap(),
            vec!["src/lib.rs".to_string(), "src/main.rs".to_string()]
        );
    }

    #[test]
    fn test_archive_rules() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");

        assert!(matches!(
            store.set_archived(&a.id, true),
            Err(Error::NotArchivable { .. })
        ));
        assert!(matches!(
            store.set_archived(&a.id, false),
            Err(Error::NotArchived { .. })
        ));

        store.set_status(&a.id, Status::OnHold).unwrap();
        let archived = store.set_archived(&a.id, true).unwrap();
        assert!(archived.archived);
        assert_eq!(archived.status, Status::OnHold);

        assert!(matches!(
            store.set_archived(&a.id, true),
            Err(Error::AlreadyArchived { .. })
        ));

        let restored = store.set_archived(&a.id, false).unwrap();
        assert!(!restored.archived);
    }

    #[test]
    fn test_archive_is_flat() {
        let (mut store, root) = store_with_root();
        let a = new_child(&mut store, &root.id, "A");
        let a1 = new_child(&mut store, &a.id, "A1");
        store.set_status(&a.id, Status::Done).unwrap();

        store.set_archived(&a.id, true).unwrap();
        assert!(!store.get_track(&a1.id).unwrap().unwrap().archived);
    }
}
