//! Blocking-dependency edges and cycle detection.
//!
//! Edges are directed `(blocking, blocked)` pairs: the blocking track must
//! reach a final status before the blocked one may become active. Helpers
//! take `&Connection` so they serve both plain reads and transaction scopes
//! (`Transaction` derefs to `Connection`).

use crate::error::{Error, Result};
use crate::model::Status;
use crate::storage::sqlite::{get_track_tx, track_exists_tx, SqliteStorage};
use crate::storage::status::write_status_tx;
use rusqlite::Connection;
use std::collections::{HashSet, VecDeque};

pub(crate) fn blockers_of_conn(conn: &Connection, id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT blocking_id FROM dependencies WHERE blocked_id = ?1 ORDER BY created_at, blocking_id",
    )?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

pub(crate) fn dependents_of_conn(conn: &Connection, id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT blocked_id FROM dependencies WHERE blocking_id = ?1 ORDER BY created_at, blocked_id",
    )?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Whether inserting `(blocking, blocked)` would close a directed cycle.
///
/// BFS outward from `blocked` along existing `blocking -> blocked` edges;
/// if `blocking` is reachable, the new edge would complete a loop.
pub(crate) fn would_create_cycle_conn(
    conn: &Connection,
    blocking_id: &str,
    blocked_id: &str,
) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT blocked_id FROM dependencies WHERE blocking_id = ?1")?;

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([blocked_id.to_string()]);

    while let Some(current) = queue.pop_front() {
        if current == blocking_id {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            continue;
        }

        let next = stmt
            .query_map([current.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for id in next {
            if !visited.contains(&id) {
                queue.push_back(id);
            }
        }
    }

    Ok(false)
}

/// Whether `id` has at least one blocker and every blocker is `done`.
pub(crate) fn all_blockers_done_conn(conn: &Connection, id: &str) -> Result<bool> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM dependencies WHERE blocked_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    if total == 0 {
        return Ok(false);
    }

    let unfinished: i64 = conn.query_row(
        "SELECT COUNT(*) FROM dependencies d
         JOIN tracks t ON t.id = d.blocking_id
         WHERE d.blocked_id = ?1 AND t.status <> 'done'",
        [id],
        |row| row.get(0),
    )?;
    Ok(unfinished == 0)
}

impl SqliteStorage {
    /// Ids of tracks blocking `id` (edges `(x, id)`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn blockers_of(&self, id: &str) -> Result<Vec<String>> {
        blockers_of_conn(self.conn(), id)
    }

    /// Ids of tracks that `id` blocks (edges `(id, y)`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn dependents_of(&self, id: &str) -> Result<Vec<String>> {
        dependents_of_conn(self.conn(), id)
    }

    /// Whether adding `(blocking, blocked)` would create a cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn would_create_cycle(&self, blocking_id: &str, blocked_id: &str) -> Result<bool> {
        would_create_cycle_conn(self.conn(), blocking_id, blocked_id)
    }

    /// Add a blocking edge.
    ///
    /// Re-adding an existing edge is a no-op. If the blocked track is
    /// `planned` it is forced to `blocked` in the same transaction.
    ///
    /// # Errors
    ///
    /// `SelfDependency` when the ids are equal, `TrackNotFound` when either
    /// id is absent, `CycleDetected` when the blocked track already reaches
    /// the blocking track.
    pub fn add_edge(&mut self, blocking_id: &str, blocked_id: &str) -> Result<()> {
        self.mutate("add_edge", |tx, log| {
            if blocking_id == blocked_id {
                return Err(Error::SelfDependency { id: blocking_id.to_string() });
            }
            if !track_exists_tx(tx, blocking_id)? {
                return Err(Error::TrackNotFound { id: blocking_id.to_string() });
            }
            let blocked = get_track_tx(tx, blocked_id)?
                .ok_or_else(|| Error::TrackNotFound { id: blocked_id.to_string() })?;

            if would_create_cycle_conn(tx, blocking_id, blocked_id)? {
                return Err(Error::CycleDetected {
                    blocking: blocking_id.to_string(),
                    blocked: blocked_id.to_string(),
                });
            }

            tx.execute(
                "INSERT OR IGNORE INTO dependencies (blocking_id, blocked_id, created_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![blocking_id, blocked_id, chrono::Utc::now().timestamp_millis()],
            )?;

            if blocked.status == Status::Planned {
                write_status_tx(tx, blocked_id, Status::Blocked)?;
                log.record_blocked(blocked_id);
            }

            Ok(())
        })
    }

    /// Remove a blocking edge.
    ///
    /// Removing an absent edge is a no-op. If the blocked track is
    /// `blocked` and its last blocker just went away, it is forced back to
    /// `planned` in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage write fails.
    pub fn remove_edge(&mut self, blocking_id: &str, blocked_id: &str) -> Result<()> {
        self.mutate("remove_edge", |tx, log| {
            tx.execute(
                "DELETE FROM dependencies WHERE blocking_id = ?1 AND blocked_id = ?2",
                rusqlite::params![blocking_id, blocked_id],
            )?;

            if let Some(blocked) = get_track_tx(tx, blocked_id)? {
                if blocked.status == Status::Blocked
                    && blockers_of_conn(tx, blocked_id)?.is_empty()
                {
                    write_status_tx(tx, blocked_id, Status::Planned)?;
                    log.record_unblocked(blocked_id);
                }
            }

            Ok(())
        })
    }
}
