//! Database schema definitions.
//!
//! Timestamps are stored as INTEGER (Unix milliseconds). The composite
//! primary keys on `track_files` and `dependencies` enforce deduplication
//! at the store level; the `CHECK` on `dependencies` rejects self-loops
//! before the engine is even consulted.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the track database.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Core Tables
-- ====================

-- Tracks: the work hierarchy. parent_id is NULL only for the root track.
CREATE TABLE IF NOT EXISTS tracks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    parent_id TEXT REFERENCES tracks(id),
    summary TEXT NOT NULL DEFAULT '',
    next_prompt TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'planned',
    worktree TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    archived INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    completed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_tracks_parent ON tracks(parent_id);
CREATE INDEX IF NOT EXISTS idx_tracks_status ON tracks(status);
CREATE INDEX IF NOT EXISTS idx_tracks_worktree ON tracks(worktree);

-- Track files: associated file paths, deduplicated by the primary key.
CREATE TABLE IF NOT EXISTS track_files (
    track_id TEXT NOT NULL REFERENCES tracks(id),
    path TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (track_id, path)
);

-- Dependencies: blocking_id must finish before blocked_id may proceed.
CREATE TABLE IF NOT EXISTS dependencies (
    blocking_id TEXT NOT NULL REFERENCES tracks(id),
    blocked_id TEXT NOT NULL REFERENCES tracks(id),
    created_at INTEGER NOT NULL,
    PRIMARY KEY (blocking_id, blocked_id),
    CHECK (blocking_id <> blocked_id)
);

CREATE INDEX IF NOT EXISTS idx_dependencies_blocked ON dependencies(blocked_id);
";

/// Apply the schema to a database connection.
///
/// Idempotent and safe to call on every open.
///
/// # Errors
///
/// Returns an error if a pragma or DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // WAL allows a long-lived reader alongside short CLI writers.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![CURRENT_SCHEMA_VERSION, chrono::Utc::now().timestamp_millis()],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert!(tables.contains(&"tracks".to_string()));
        assert!(tables.contains(&"track_files".to_string()));
        assert!(tables.contains(&"dependencies".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");

        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_self_dependency_rejected_by_check() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO tracks (id, title, created_at, updated_at) VALUES ('aaaa1111', 't', 0, 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO dependencies (blocking_id, blocked_id, created_at)
             VALUES ('aaaa1111', 'aaaa1111', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_file_rows_collapse() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO tracks (id, title, created_at, updated_at) VALUES ('aaaa1111', 't', 0, 0)",
            [],
        )
        .unwrap();

        for _ in 0..2 {
            conn.execute(
                "INSERT OR IGNORE INTO track_files (track_id, path, created_at)
                 VALUES ('aaaa1111', 'src/main.rs', 0)",
                [],
            )
            .unwrap();
        }

        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM track_files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
