//! Schema migrations, applied in order and tracked in `schema_version`.

use crate::error::SqliteResult;
use rusqlite::Connection;
use tracing::debug;

const MIGRATIONS: &[&str] = &[
    // v1: reports table. content_hash is UNIQUE so a re-upload of identical
    // bytes resolves to the existing row.
    "CREATE TABLE IF NOT EXISTS reports (
        id            TEXT PRIMARY KEY,
        filename      TEXT NOT NULL,
        content_hash  TEXT NOT NULL UNIQUE,
        status        TEXT NOT NULL DEFAULT 'pending',
        error         TEXT,
        title         TEXT,
        page_count    INTEGER,
        entity_count  INTEGER NOT NULL DEFAULT 0,
        vector_chunks INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);",
];

pub fn apply_migrations(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);",
    )?;
    let current: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;

    for (idx, migration) in MIGRATIONS.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        debug!(version, "applying schema migration");
        conn.execute_batch(migration)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    }
    Ok(())
}
