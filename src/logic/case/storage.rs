//! Case/event store - SQLite persistence and queries

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::types::{case_key, Case, EventRecord, StoreCounts, STATUS_OPEN};
use crate::error::AppResult;
use crate::logic::admission::Action;
use crate::logic::forensics::metrics::CaseMetrics;
use crate::logic::forensics::report::ReportArtifacts;

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cases (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL UNIQUE,
    zone TEXT NOT NULL,
    ip TEXT NOT NULL,
    asn INTEGER NOT NULL,
    country TEXT NOT NULL DEFAULT '',
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'OPEN',
    attack_rps REAL NOT NULL DEFAULT 0,
    est_bandwidth_mbps REAL NOT NULL DEFAULT 0,
    system_capacity_rps REAL NOT NULL DEFAULT 0,
    af REAL NOT NULL DEFAULT 0,
    df REAL NOT NULL DEFAULT 0,
    bof REAL NOT NULL DEFAULT 1,
    evidence_count INTEGER NOT NULL DEFAULT 0,
    mercy REAL NOT NULL DEFAULT 1,
    justice REAL NOT NULL DEFAULT 0,
    snapshot_version INTEGER NOT NULL DEFAULT 0,
    abuse_report TEXT,
    section504_draft TEXT
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL REFERENCES cases(id),
    ts INTEGER NOT NULL,
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    action TEXT NOT NULL,
    score REAL NOT NULL,
    hits INTEGER NOT NULL,
    colo TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cases_last_seen ON cases(last_seen);
CREATE INDEX IF NOT EXISTS idx_events_case_ts ON events(case_id, ts);
"#;

/// SQLite-backed case/event store.
///
/// One logical instance owns the database; callers share it behind an
/// `Arc`. The connection mutex makes each operation atomic with respect to
/// the others.
pub struct CaseStore {
    conn: Mutex<Connection>,
}

impl CaseStore {
    /// Open (or create) the store at `path` and apply the schema.
    pub fn open(path: &str) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // journal_mode returns the resulting mode, so it cannot go
        // through execute_batch.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests and ephemeral runs.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Idempotent case creation: an existing key only gets its `last_seen`
    /// bumped; a new key creates an OPEN case. Returns the case id.
    pub fn upsert_case(
        &self,
        zone: &str,
        ip: &str,
        asn: u32,
        country: &str,
        ts: i64,
    ) -> AppResult<String> {
        let key = case_key(zone, ip, asn);
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO cases (id, key, zone, ip, asn, country, first_seen, last_seen, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)
            ON CONFLICT(key) DO UPDATE SET
                last_seen = MAX(last_seen, excluded.last_seen)
            "#,
            params![
                Uuid::new_v4().to_string(),
                key,
                zone,
                ip,
                asn,
                country,
                ts,
                STATUS_OPEN
            ],
        )?;

        let id =
            conn.query_row("SELECT id FROM cases WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })?;
        Ok(id)
    }

    /// Append one event to a case's audit trail.
    pub fn append_event(&self, case_id: &str, event: &EventRecord) -> AppResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO events (case_id, ts, path, method, user_agent, action, score, hits, colo)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                case_id,
                event.ts,
                event.path,
                event.method,
                event.user_agent,
                event.action.as_str(),
                event.score,
                event.hits,
                event.colo
            ],
        )?;
        Ok(())
    }

    /// Events for a case with `ts >= from_ts`, ordered by timestamp.
    pub fn events_in_window(&self, case_id: &str, from_ts: i64) -> AppResult<Vec<EventRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT ts, path, method, user_agent, action, score, hits, colo
            FROM events
            WHERE case_id = ?1 AND ts >= ?2
            ORDER BY ts ASC, id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![case_id, from_ts], event_from_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Write the full metric snapshot and report artifacts in one atomic
    /// update. The caller (aggregation engine) serializes these per case.
    pub fn update_snapshot(
        &self,
        case_id: &str,
        metrics: &CaseMetrics,
        artifacts: &ReportArtifacts,
        last_seen: i64,
    ) -> AppResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            UPDATE cases SET
                last_seen = MAX(last_seen, ?2),
                status = ?3,
                attack_rps = ?4,
                est_bandwidth_mbps = ?5,
                system_capacity_rps = ?6,
                af = ?7,
                df = ?8,
                bof = ?9,
                evidence_count = ?10,
                mercy = ?11,
                justice = ?12,
                abuse_report = ?13,
                section504_draft = ?14,
                snapshot_version = snapshot_version + 1
            WHERE id = ?1
            "#,
            params![
                case_id,
                last_seen,
                STATUS_OPEN,
                metrics.attack_rps,
                metrics.est_bandwidth_mbps,
                metrics.system_capacity_rps,
                metrics.af,
                metrics.df,
                metrics.bof,
                metrics.evidence_count,
                metrics.mercy,
                metrics.justice,
                artifacts.abuse_report,
                artifacts.section504_draft
            ],
        )?;
        Ok(())
    }

    pub fn case_by_id(&self, case_id: &str) -> AppResult<Option<Case>> {
        let conn = self.conn.lock();
        let case = conn
            .query_row(
                &format!("{CASE_SELECT} WHERE id = ?1"),
                params![case_id],
                case_from_row,
            )
            .optional()?;
        Ok(case)
    }

    pub fn case_by_key(&self, key: &str) -> AppResult<Option<Case>> {
        let conn = self.conn.lock();
        let case = conn
            .query_row(
                &format!("{CASE_SELECT} WHERE key = ?1"),
                params![key],
                case_from_row,
            )
            .optional()?;
        Ok(case)
    }

    /// Most recently active cases, newest first.
    pub fn recent_cases(&self, limit: u32) -> AppResult<Vec<Case>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare(&format!("{CASE_SELECT} ORDER BY last_seen DESC LIMIT ?1"))?;
        let rows = stmt.query_map(params![limit], case_from_row)?;
        let mut cases = Vec::new();
        for row in rows {
            cases.push(row?);
        }
        Ok(cases)
    }

    pub fn counts(&self) -> AppResult<StoreCounts> {
        let conn = self.conn.lock();
        let cases: u64 = conn.query_row("SELECT COUNT(*) FROM cases", [], |r| r.get(0))?;
        let events: u64 = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
        Ok(StoreCounts { cases, events })
    }
}

const CASE_SELECT: &str = r#"
    SELECT id, key, zone, ip, asn, country, first_seen, last_seen, status,
           attack_rps, est_bandwidth_mbps, system_capacity_rps, af, df, bof,
           evidence_count, mercy, justice, snapshot_version,
           abuse_report, section504_draft
    FROM cases
"#;

fn case_from_row(row: &Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        id: row.get(0)?,
        key: row.get(1)?,
        zone: row.get(2)?,
        ip: row.get(3)?,
        asn: row.get(4)?,
        country: row.get(5)?,
        first_seen: row.get(6)?,
        last_seen: row.get(7)?,
        status: row.get(8)?,
        attack_rps: row.get(9)?,
        est_bandwidth_mbps: row.get(10)?,
        system_capacity_rps: row.get(11)?,
        af: row.get(12)?,
        df: row.get(13)?,
        bof: row.get(14)?,
        evidence_count: row.get(15)?,
        mercy: row.get(16)?,
        justice: row.get(17)?,
        snapshot_version: row.get(18)?,
        abuse_report: row.get(19)?,
        section504_draft: row.get(20)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    let action: String = row.get(4)?;
    let action = action.parse::<Action>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(EventRecord {
        ts: row.get(0)?,
        path: row.get(1)?,
        method: row.get(2)?,
        user_agent: row.get(3)?,
        action,
        score: row.get(5)?,
        hits: row.get(6)?,
        colo: row.get(7)?,
    })
}
