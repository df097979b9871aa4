//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Stored coaching analyses, one row per completed pipeline run
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            user_text TEXT NOT NULL,
            game TEXT NOT NULL CHECK(game IN ('fifa', 'lol')),
            created_at TEXT NOT NULL,
            expire_at TEXT NOT NULL,
            summary TEXT NOT NULL,
            top_tips TEXT NOT NULL DEFAULT '[]',
            training_drills TEXT NOT NULL DEFAULT '[]',
            rating REAL,
            confidence REAL,
            response_type TEXT NOT NULL CHECK(response_type IN ('simple', 'detailed'))
        );

        CREATE INDEX IF NOT EXISTS idx_analyses_user_created ON analyses(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_analyses_expire ON analyses(expire_at);

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}
