//! The storage repository. Every operation runs in its own
//! short-lived session; there is no cross-session transactional coupling.
//! Uniqueness is enforced at the store via insert-or-ignore, not upsert —
//! duplicate inserts are recovered `DuplicateKey` conditions,
//! not errors.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use oilgas_types::{Alert, RawEvent};

use crate::schema::init_schema;
use crate::Result;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Attempts an insert; on conflict with the `(source_system,
    /// source_event_id)` uniqueness (applied only when `source_event_id`
    /// is non-null) returns the existing id with `inserted=false`.
    pub fn insert_raw_event(&self, event: &RawEvent) -> Result<(bool, i64)> {
        let ingest_time = event.ingest_time.unwrap_or_else(Utc::now);
        let payload_text = serde_json::to_string(&event.payload_json)?;

        self.conn.execute(
            r#"
            INSERT INTO event_log
                (source_system, source_event_id, event_time, ingest_time, payload_json, content_hash, canonical_doc_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(source_system, source_event_id) WHERE source_event_id IS NOT NULL DO NOTHING
            "#,
            params![
                event.source_system,
                event.source_event_id,
                event.event_time.map(|t| t.to_rfc3339()),
                ingest_time.to_rfc3339(),
                payload_text,
                event.content_hash,
                event.canonical_doc_id,
            ],
        )?;

        if self.conn.changes() > 0 {
            return Ok((true, self.conn.last_insert_rowid()));
        }

        // Conflict: look the existing row up by idempotency key. A null
        // source_event_id never reaches this branch — the conflict target
        // above only applies when source_event_id is non-null, so an
        // insert with a null id always takes the changes()>0 path.
        if let Some(source_event_id) = &event.source_event_id {
            let existing_id: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM event_log WHERE source_system = ?1 AND source_event_id = ?2",
                    params![event.source_system, source_event_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing_id {
                return Ok((false, id));
            }
        }

        unreachable!("insert with null source_event_id never conflicts")
    }

    /// Attempts an insert; on conflict with the `alert_id` uniqueness
    /// returns `false`.
    pub fn insert_alert(&self, alert: &Alert) -> Result<bool> {
        let ingest_time = alert.ingest_time.unwrap_or_else(Utc::now);

        self.conn.execute(
            r#"
            INSERT INTO alerts
                (alert_id, tier, event_type, event_time, ingest_time, company_id, asset_id,
                 canonical_doc_id, evidence_pointer, score_summary, summary, details, regime_context)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(alert_id) DO NOTHING
            "#,
            params![
                alert.alert_id,
                alert.tier,
                alert.event_type,
                alert.event_time.map(|t| t.to_rfc3339()),
                ingest_time.to_rfc3339(),
                alert.company_id,
                alert.asset_id,
                alert.canonical_doc_id,
                serde_json::to_string(&alert.evidence_pointer)?,
                serde_json::to_string(&alert.score_summary)?,
                alert.summary,
                serde_json::to_string(&alert.details)?,
                alert.regime_context.as_ref().map(serde_json::to_string).transpose()?,
            ],
        )?;

        Ok(self.conn.changes() > 0)
    }

    /// Returns events with `ingest_time >= now - hours`, newest first.
    pub fn load_recent_events(&self, hours: i64) -> Result<Vec<RawEvent>> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, source_system, source_event_id, event_time, ingest_time,
                   payload_json, content_hash, canonical_doc_id
            FROM event_log
            WHERE ingest_time >= ?1
            ORDER BY ingest_time DESC
            "#,
        )?;

        let rows = stmt.query_map(params![cutoff.to_rfc3339()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, source_system, source_event_id, event_time, ingest_time, payload_text, content_hash, canonical_doc_id) = row?;
            events.push(RawEvent {
                id: Some(id),
                source_system,
                source_event_id,
                event_time: parse_rfc3339(event_time.as_deref()),
                ingest_time: parse_rfc3339(Some(&ingest_time)),
                payload_json: serde_json::from_str(&payload_text)?,
                content_hash,
                canonical_doc_id,
            });
        }
        Ok(events)
    }

    /// The analogous scan over alerts, newest first, capped at `limit`.
    pub fn load_recent_alerts(&self, hours: i64, limit: i64) -> Result<Vec<Alert>> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, alert_id, tier, event_type, event_time, ingest_time, company_id, asset_id,
                   canonical_doc_id, evidence_pointer, score_summary, summary, details, regime_context
            FROM alerts
            WHERE ingest_time >= ?1
            ORDER BY ingest_time DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![cutoff.to_rfc3339(), limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, String>(11)?,
                row.get::<_, String>(12)?,
                row.get::<_, Option<String>>(13)?,
            ))
        })?;

        let mut alerts = Vec::new();
        for row in rows {
            let (id, alert_id, tier, event_type, event_time, ingest_time, company_id, asset_id,
                canonical_doc_id, evidence_pointer, score_summary, summary, details, regime_context) = row?;
            alerts.push(Alert {
                id: Some(id),
                alert_id,
                tier,
                event_type,
                event_time: parse_rfc3339(event_time.as_deref()),
                ingest_time: parse_rfc3339(Some(&ingest_time)),
                company_id,
                asset_id,
                canonical_doc_id,
                evidence_pointer: serde_json::from_str(&evidence_pointer)?,
                score_summary: serde_json::from_str(&score_summary)?,
                summary,
                details: serde_json::from_str(&details)?,
                regime_context: regime_context.map(|s| serde_json::from_str::<Value>(&s)).transpose()?,
            });
        }
        Ok(alerts)
    }

    /// Per-`source_system` event counts over the window.
    pub fn load_source_counts(&self, hours: i64) -> Result<BTreeMap<String, i64>> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let mut stmt = self.conn.prepare(
            "SELECT source_system, COUNT(*) FROM event_log WHERE ingest_time >= ?1 GROUP BY source_system",
        )?;
        let rows = stmt.query_map(params![cutoff.to_rfc3339()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (source, count) = row?;
            counts.insert(source, count);
        }
        Ok(counts)
    }
}

fn parse_rfc3339(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(|s| DateTime::parse_from_rfc3339(s).ok()).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event(source_event_id: Option<&str>) -> RawEvent {
        RawEvent::new(
            "alaska_permits",
            source_event_id.map(|s| s.to_string()),
            Some(Utc::now()),
            json!({"type": "permit_filed", "permit_id": "AK-1"}),
        )
    }

    #[test]
    fn insert_raw_event_is_idempotent_on_source_event_id() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(Some("evt-1"));

        let (inserted_first, id_first) = db.insert_raw_event(&event).unwrap();
        let (inserted_second, id_second) = db.insert_raw_event(&event).unwrap();

        assert!(inserted_first);
        assert!(!inserted_second);
        assert_eq!(id_first, id_second);
    }

    #[test]
    fn insert_raw_event_without_source_event_id_always_inserts() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(None);

        let (inserted_first, id_first) = db.insert_raw_event(&event).unwrap();
        let (inserted_second, id_second) = db.insert_raw_event(&event).unwrap();

        assert!(inserted_first);
        assert!(inserted_second);
        assert_ne!(id_first, id_second);
    }

    #[test]
    fn load_recent_events_returns_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_raw_event(&sample_event(Some("a"))).unwrap();
        db.insert_raw_event(&sample_event(Some("b"))).unwrap();

        let events = db.load_recent_events(24).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn load_source_counts_groups_by_source_system() {
        let db = Database::open_in_memory().unwrap();
        db.insert_raw_event(&sample_event(Some("a"))).unwrap();
        db.insert_raw_event(&sample_event(Some("b"))).unwrap();

        let counts = db.load_source_counts(24).unwrap();
        assert_eq!(counts.get("alaska_permits"), Some(&2));
    }

    #[test]
    fn insert_alert_is_idempotent_on_alert_id() {
        let db = Database::open_in_memory().unwrap();
        let alert = Alert {
            id: None,
            alert_id: "abc123".into(),
            tier: "high".into(),
            event_type: "chain_progression".into(),
            event_time: Some(Utc::now()),
            ingest_time: None,
            company_id: None,
            asset_id: None,
            canonical_doc_id: "alaska_permits:deadbeef".into(),
            evidence_pointer: json!({}),
            score_summary: json!({"score": 1.0}),
            summary: "[HIGH] chain progression AK-1".into(),
            details: json!({}),
            regime_context: None,
        };

        assert!(db.insert_alert(&alert).unwrap());
        assert!(!db.insert_alert(&alert).unwrap());
    }
}
