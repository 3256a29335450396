use rusqlite::Connection;

use crate::Result;

// Schema version (increment when changing table definitions)
pub const SCHEMA_VERSION: i32 = 1;

// event_log and alerts are append-only; the partial unique index on
// (source_system, source_event_id) is the sole idempotency guard —
// there is intentionally no update path for either table.

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != SCHEMA_VERSION {
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS event_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_system TEXT NOT NULL,
            source_event_id TEXT,
            event_time TEXT,
            ingest_time TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            canonical_doc_id TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_event_log_idempotency
            ON event_log(source_system, source_event_id)
            WHERE source_event_id IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_event_log_event_time ON event_log(event_time);
        CREATE INDEX IF NOT EXISTS idx_event_log_ingest_time ON event_log(ingest_time);

        CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alert_id TEXT NOT NULL UNIQUE,
            tier TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_time TEXT,
            ingest_time TEXT NOT NULL,
            company_id TEXT,
            asset_id TEXT,
            canonical_doc_id TEXT NOT NULL,
            evidence_pointer TEXT NOT NULL,
            score_summary TEXT NOT NULL,
            summary TEXT NOT NULL,
            details TEXT NOT NULL,
            regime_context TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_ingest_time ON alerts(ingest_time);
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS alerts;
        DROP TABLE IF EXISTS event_log;
        "#,
    )?;
    Ok(())
}
