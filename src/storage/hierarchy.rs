//! Parent/child tree operations.
//!
//! Descendant enumeration uses an explicit worklist rather than recursion,
//! so arbitrarily deep trees cannot exhaust the stack. Traversal order is
//! deterministic: breadth-first, siblings by `(sort_order, created_at, id)`.

use crate::error::{Error, Result};
use crate::id::generate_id;
use crate::model::{NewTrack, Status, Track};
use crate::storage::sqlite::{
    insert_track_tx, map_track, require_track_tx, track_exists_tx, SqliteStorage, TRACK_COLUMNS,
};
use rusqlite::Transaction;
use std::collections::VecDeque;

/// Where to place a track relative to its target sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

pub(crate) fn children_of_tx(
    tx: &Transaction<'_>,
    parent_id: Option<&str>,
) -> Result<Vec<Track>> {
    let sql = match parent_id {
        Some(_) => format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE parent_id = ?1 \
             ORDER BY sort_order, created_at, id"
        ),
        None => format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE parent_id IS NULL \
             ORDER BY sort_order, created_at, id"
        ),
    };
    let mut stmt = tx.prepare(&sql)?;
    let rows = match parent_id {
        Some(id) => stmt.query_map([id], map_track)?.collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt.query_map([], map_track)?.collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(rows)
}

/// Transitive descendants of `id` in deterministic breadth-first order.
pub(crate) fn descendant_ids_tx(tx: &Transaction<'_>, id: &str) -> Result<Vec<String>> {
    let mut stmt = tx.prepare(
        "SELECT id FROM tracks WHERE parent_id = ?1 ORDER BY sort_order, created_at, id",
    )?;

    let mut result = Vec::new();
    let mut queue = VecDeque::from([id.to_string()]);
    while let Some(current) = queue.pop_front() {
        let children = stmt
            .query_map([current.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for child in children {
            result.push(child.clone());
            queue.push_back(child);
        }
    }
    Ok(result)
}

fn next_sort_order_tx(tx: &Transaction<'_>, parent_id: Option<&str>) -> Result<i64> {
    let order: i64 = match parent_id {
        Some(id) => tx.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM tracks WHERE parent_id = ?1",
            [id],
            |row| row.get(0),
        )?,
        None => 0,
    };
    Ok(order)
}

impl SqliteStorage {
    /// Create a track under an existing parent (or the root, for `init`).
    ///
    /// The new track gets a generated id, status `planned`, and
    /// `sort_order` one past the current last sibling.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty title or a second root;
    /// `UnknownParent` if `parent_id` names no track.
    pub fn create_track(&mut self, params: NewTrack) -> Result<Track> {
        let title = params.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidArgument("track title cannot be empty".into()));
        }

        self.mutate("create_track", move |tx, _log| {
            if let Some(ref parent_id) = params.parent_id {
                if !track_exists_tx(tx, parent_id)? {
                    return Err(Error::UnknownParent { id: parent_id.clone() });
                }
            } else if !children_of_tx(tx, None)?.is_empty() {
                return Err(Error::InvalidArgument(
                    "a root track already exists; pass a parent id".into(),
                ));
            }

            let now = chrono::Utc::now().timestamp_millis();
            let sort_order = next_sort_order_tx(tx, params.parent_id.as_deref())?;
            let track = Track {
                id: generate_id(),
                title,
                parent_id: params.parent_id,
                summary: params.summary,
                next_prompt: params.next_prompt,
                status: Status::Planned,
                worktree: params.worktree,
                sort_order,
                archived: false,
                created_at: now,
                updated_at: now,
                completed_at: None,
            };

            insert_track_tx(tx, &track)?;
            Ok(track)
        })
    }

    /// Direct children of a track, ordered by `(sort_order, created_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn children_of(&self, id: &str) -> Result<Vec<Track>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE parent_id = ?1 \
             ORDER BY sort_order, created_at, id"
        ))?;
        let rows = stmt.query_map([id], map_track)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Ids of all transitive descendants, breadth-first, deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn descendant_ids(&self, id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT id FROM tracks WHERE parent_id = ?1 ORDER BY sort_order, created_at, id",
        )?;

        let mut result = Vec::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(current) = queue.pop_front() {
            let children = stmt
                .query_map([current.as_str()], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for child in children {
                result.push(child.clone());
                queue.push_back(child);
            }
        }
        Ok(result)
    }

    /// Move a track immediately before or after a sibling.
    ///
    /// The full sibling list is renumbered 0..n-1 in the new order, so
    /// repeated moves never accumulate precision drift and untouched
    /// siblings keep their relative order.
    ///
    /// # Errors
    ///
    /// `TrackNotFound` for either id, `DifferentParent` when the two
    /// tracks are not siblings, `InvalidArgument` when `id == target_id`.
    pub fn move_relative(&mut self, id: &str, target_id: &str, position: Position) -> Result<()> {
        self.mutate("move_relative", |tx, _log| {
            let track = require_track_tx(tx, id)?;
            let target = require_track_tx(tx, target_id)?;

            if id == target_id {
                return Err(Error::InvalidArgument(
                    "cannot move a track relative to itself".into(),
                ));
            }
            if track.parent_id != target.parent_id {
                return Err(Error::DifferentParent {
                    track: id.to_string(),
                    target: target_id.to_string(),
                });
            }

            let siblings = children_of_tx(tx, track.parent_id.as_deref())?;
            let mut order: Vec<String> = siblings
                .iter()
                .map(|t| t.id.clone())
                .filter(|sibling_id| sibling_id != id)
                .collect();

            let target_index = order
                .iter()
                .position(|sibling_id| sibling_id == target_id)
                .ok_or_else(|| Error::TrackNotFound { id: target_id.to_string() })?;
            let insert_at = match position {
                Position::Before => target_index,
                Position::After => target_index + 1,
            };
            order.insert(insert_at, id.to_string());

            let mut stmt = tx.prepare("UPDATE tracks SET sort_order = ?1 WHERE id = ?2")?;
            for (index, sibling_id) in order.iter().enumerate() {
                stmt.execute(rusqlite::params![index as i64, sibling_id])?;
            }
            Ok(())
        })
    }

    /// Delete a track and every descendant, plus all file associations and
    /// dependency edges touching any of them, in one transaction.
    ///
    /// Returns the number of tracks deleted (`1 + descendants`).
    ///
    /// # Errors
    ///
    /// `TrackNotFound` if absent; `CannotDeleteRoot` for the root track.
    pub fn delete_cascade(&mut self, id: &str) -> Result<usize> {
        self.mutate("delete_cascade", |tx, _log| {
            let track = require_track_tx(tx, id)?;
            if track.is_root() {
                return Err(Error::CannotDeleteRoot);
            }

            let mut ids = vec![id.to_string()];
            ids.extend(descendant_ids_tx(tx, id)?);

            {
                let mut files = tx.prepare("DELETE FROM track_files WHERE track_id = ?1")?;
                let mut edges = tx.prepare(
                    "DELETE FROM dependencies WHERE blocking_id = ?1 OR blocked_id = ?1",
                )?;
                for track_id in &ids {
                    files.execute([track_id])?;
                    edges.execute([track_id])?;
                }
            }

            // Children before parents, so the parent FK never dangles.
            let mut delete = tx.prepare("DELETE FROM tracks WHERE id = ?1")?;
            for track_id in ids.iter().rev() {
                delete.execute([track_id])?;
            }

            Ok(ids.len())
        })
    }
}
