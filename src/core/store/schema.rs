//! Database schema initialization

use rusqlite::{params, Connection};

use super::StoreError;

/// Current schema version
pub(super) const SCHEMA_VERSION: i64 = 1;

/// Create tables if absent and check the schema version
pub(super) fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Non-conformance reports
        CREATE TABLE IF NOT EXISTS rncs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            number TEXT NOT NULL UNIQUE,
            year INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            created TEXT NOT NULL,
            report_date TEXT NOT NULL,
            reporter TEXT NOT NULL DEFAULT '',
            area TEXT NOT NULL DEFAULT '',
            pep TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'open',
            UNIQUE (year, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_rncs_status ON rncs(status);

        -- Last sequence handed out per year
        CREATE TABLE IF NOT EXISTS rnc_counters (
            year INTEGER PRIMARY KEY,
            last_seq INTEGER NOT NULL
        );

        -- Status history
        CREATE TABLE IF NOT EXISTS rnc_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rnc_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            from_status TEXT NOT NULL,
            to_status TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT '',
            actor TEXT NOT NULL,
            at TEXT NOT NULL,
            FOREIGN KEY (rnc_id) REFERENCES rncs(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_rnc_events_rnc ON rnc_events(rnc_id);

        -- Photo references (bytes live in object storage)
        CREATE TABLE IF NOT EXISTS rnc_photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rnc_id INTEGER NOT NULL,
            key TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            category TEXT NOT NULL,
            filename TEXT NOT NULL,
            uploaded TEXT NOT NULL,
            FOREIGN KEY (rnc_id) REFERENCES rncs(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_rnc_photos_rnc ON rnc_photos(rnc_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )?;

    let found: i64 = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get(0)
    })?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}
