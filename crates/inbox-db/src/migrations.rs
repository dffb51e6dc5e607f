use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Newest schema this build knows how to create.
pub const SCHEMA_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version = current_version(conn)?;

    if version < 1 {
        info!("Message store: running migration v1 (messages)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS messages (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                json    TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        // Must tolerate the table already existing
        info!("Message store: running migration v2 (remarks)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS remarks (
                userName    TEXT PRIMARY KEY,
                remark      TEXT
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}
