//! SQLite store handle and track CRUD.
//!
//! Engine operations in the sibling modules ([`super::hierarchy`],
//! [`super::graph`], [`super::status`]) are implemented as further
//! `impl SqliteStorage` blocks; anything multi-step goes through
//! [`SqliteStorage::mutate`] so the whole operation, cascades included,
//! commits atomically.

use crate::error::{Error, Result};
use crate::model::{Status, Track};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// SQLite-based store for the track engine.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Cascade side effects recorded during one mutation.
///
/// Passed to mutation closures so the state machine can report which
/// tracks a primary update dragged along (auto-blocked, auto-unblocked,
/// auto-superseded). The log is also traced after commit.
#[derive(Debug, Default)]
pub struct MutationLog {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Tracks forced `planned -> blocked` by a new edge.
    pub blocked: Vec<String>,
    /// Tracks forced `blocked -> planned` because their blockers cleared.
    pub unblocked: Vec<String>,
    /// Descendants forced to `superseded` by a parent completing.
    pub superseded: Vec<String>,
}

impl MutationLog {
    fn new(op_name: &str) -> Self {
        Self { op_name: op_name.to_string(), ..Self::default() }
    }

    pub fn record_blocked(&mut self, id: &str) {
        self.blocked.push(id.to_string());
    }

    pub fn record_unblocked(&mut self, id: &str) {
        self.unblocked.push(id.to_string());
    }

    pub fn record_superseded(&mut self, id: &str) {
        self.superseded.push(id.to_string());
    }
}

/// Filter for bulk track queries.
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    /// Restrict to these statuses; `None` means all six.
    pub statuses: Option<Vec<Status>>,
    /// Include archived rows (default views hide them).
    pub include_archived: bool,
    /// Restrict to one worktree tag.
    pub worktree: Option<String>,
}

impl TrackFilter {
    /// The default report filter: active statuses, unarchived only.
    #[must_use]
    pub fn active() -> Self {
        Self {
            statuses: Some(Status::ACTIVE.to_vec()),
            include_archived: false,
            worktree: None,
        }
    }

    /// Everything, archived included.
    #[must_use]
    pub fn all() -> Self {
        Self { statuses: None, include_archived: true, worktree: None }
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// Columns selected for every track read, in `map_track` order.
pub(crate) const TRACK_COLUMNS: &str = "id, title, parent_id, summary, next_prompt, status, \
     worktree, sort_order, archived, created_at, updated_at, completed_at";

/// Map a full track row (selected via [`TRACK_COLUMNS`]).
pub(crate) fn map_track(row: &rusqlite::Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        parent_id: row.get(2)?,
        summary: row.get(3)?,
        next_prompt: row.get(4)?,
        status: row.get(5)?,
        worktree: row.get(6)?,
        sort_order: row.get(7)?,
        archived: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

// ── Transaction-scoped helpers ───────────────────────────────
//
// Free functions over `&Transaction` so cascade steps in different modules
// compose inside one `mutate` call.

pub(crate) fn get_track_tx(tx: &Transaction<'_>, id: &str) -> Result<Option<Track>> {
    let track = tx
        .prepare(&format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"))?
        .query_row([id], map_track)
        .optional()?;
    Ok(track)
}

pub(crate) fn require_track_tx(tx: &Transaction<'_>, id: &str) -> Result<Track> {
    get_track_tx(tx, id)?.ok_or_else(|| Error::TrackNotFound { id: id.to_string() })
}

pub(crate) fn track_exists_tx(tx: &Transaction<'_>, id: &str) -> Result<bool> {
    let count: i64 =
        tx.query_row("SELECT COUNT(*) FROM tracks WHERE id = ?1", [id], |row| row.get(0))?;
    Ok(count > 0)
}

/// Insert a full track row. Fails with `DuplicateId` if the id is taken;
/// never expected from the generator, but checked all the same.
pub(crate) fn insert_track_tx(tx: &Transaction<'_>, track: &Track) -> Result<()> {
    if track_exists_tx(tx, &track.id)? {
        return Err(Error::DuplicateId { id: track.id.clone() });
    }

    tx.execute(
        "INSERT INTO tracks (id, title, parent_id, summary, next_prompt, status, worktree,
                             sort_order, archived, created_at, updated_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            track.id,
            track.title,
            track.parent_id,
            track.summary,
            track.next_prompt,
            track.status,
            track.worktree,
            track.sort_order,
            i64::from(track.archived),
            track.created_at,
            track.updated_at,
            track.completed_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn add_files_tx(tx: &Transaction<'_>, id: &str, paths: &[String]) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO track_files (track_id, path, created_at) VALUES (?1, ?2, ?3)",
    )?;
    for path in paths {
        stmt.execute(rusqlite::params![id, path, now])?;
    }
    Ok(())
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Another CLI invocation may hold the write lock briefly.
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;

        super::schema::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// Begins an IMMEDIATE transaction (write lock up front), runs the
    /// closure, commits on success. Any error, whether validation before
    /// the first write or a cascade step halfway through, rolls the whole
    /// transaction back.
    ///
    /// # Errors
    ///
    /// Returns the closure's error after rollback, or a storage error from
    /// begin/commit.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>, &mut MutationLog) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut log = MutationLog::new(op);
        let result = f(&tx, &mut log)?;
        tx.commit()?;

        debug!(
            op = log.op_name,
            blocked = log.blocked.len(),
            unblocked = log.unblocked.len(),
            superseded = log.superseded.len(),
            "mutation committed"
        );

        Ok(result)
    }

    // ==================
    // Track reads
    // ==================

    /// Get a track by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_track(&self, id: &str) -> Result<Option<Track>> {
        let track = self
            .conn
            .prepare(&format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"))?
            .query_row([id], map_track)
            .optional()?;
        Ok(track)
    }

    /// Whether a track with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn track_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks WHERE id = ?1", [id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// The root track (`parent_id IS NULL`), if the project has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn root_track(&self) -> Result<Option<Track>> {
        let track = self
            .conn
            .prepare(&format!(
                "SELECT {TRACK_COLUMNS} FROM tracks WHERE parent_id IS NULL"
            ))?
            .query_row([], map_track)
            .optional()?;
        Ok(track)
    }

    /// Bulk filtered read, ordered by `(sort_order, created_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn query_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let mut sql = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE 1=1");
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref statuses) = filter.statuses {
            let placeholders: Vec<String> = (0..statuses.len())
                .map(|i| format!("?{}", params.len() + i + 1))
                .collect();
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
            for status in statuses {
                params.push(Box::new(*status));
            }
        }

        if !filter.include_archived {
            sql.push_str(" AND archived = 0");
        }

        if let Some(ref worktree) = filter.worktree {
            params.push(Box::new(worktree.clone()));
            sql.push_str(&format!(" AND worktree = ?{}", params.len()));
        }

        sql.push_str(" ORDER BY sort_order, created_at, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let tracks = stmt
            .query_map(params_ref.as_slice(), map_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// Insert a pre-built track row in its own transaction.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateId` if the id is already present.
    pub fn insert_track(&mut self, track: &Track) -> Result<()> {
        self.mutate("insert_track", |tx, _log| insert_track_tx(tx, track))
    }

    // ==================
    // File associations
    // ==================

    /// File paths associated with one track, ordered by insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn files_of(&self, id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT path FROM track_files WHERE track_id = ?1 ORDER BY created_at, path",
        )?;
        let paths = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(paths)
    }

    /// All file associations keyed by track id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_files(&self) -> Result<HashMap<String, Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT track_id, path FROM track_files ORDER BY created_at, path")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (id, path) in rows {
            map.entry(id).or_default().push(path);
        }
        Ok(map)
    }

    /// Every dependency edge as `(blocking_id, blocked_id)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_dependencies(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT blocking_id, blocked_id FROM dependencies ORDER BY created_at, blocking_id",
        )?;
        let edges = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    // ==================
    // Resolution
    // ==================

    /// Resolve a track by id or exact title.
    ///
    /// Ids win over titles (an id is never ambiguous). A title shared by
    /// several tracks fails with `AmbiguousTrack` listing the matches.
    ///
    /// # Errors
    ///
    /// `TrackNotFound` when nothing matches; `AmbiguousTrack` when a title
    /// matches more than one track.
    pub fn resolve_track(&self, input: &str) -> Result<Track> {
        if let Some(track) = self.get_track(input)? {
            return Ok(track);
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE title = ?1 ORDER BY created_at, id"
        ))?;
        let mut matches = stmt
            .query_map([input], map_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        match matches.len() {
            0 => Err(Error::TrackNotFound { id: input.to_string() }),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousTrack {
                input: input.to_string(),
                matches: matches.into_iter().map(|t| (t.id, t.title)).collect(),
            }),
        }
    }
}
