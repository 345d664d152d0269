//! SQLite event store implementation.

use crate::{Error, Event, EventKind, Result, RunId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// How a stored run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Answered,
    /// Failed with this error classification.
    Failed(String),
    /// No terminal event was recorded.
    Incomplete,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Answered => f.write_str("answered"),
            Self::Failed(kind) => f.write_str(kind),
            Self::Incomplete => f.write_str("incomplete"),
        }
    }
}

/// One line of `list_runs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub id: RunId,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub tool_calls: usize,
    pub status: RunStatus,
}

/// SQLite-backed event store.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    /// Open or create an event store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory event store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                run_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_run
                ON events(run_id, seq);
            "#,
        )?;
        Ok(())
    }

    /// Append an event to the store.
    pub fn append(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, run_id, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id.to_string(),
                event.run_id.to_string(),
                event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                event.kind.name(),
                serde_json::to_string(&event.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Append all events of a run in one transaction.
    pub fn append_all<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO events (id, run_id, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for event in events {
                stmt.execute(params![
                    event.id.to_string(),
                    event.run_id.to_string(),
                    event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                    event.kind.name(),
                    serde_json::to_string(&event.kind)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the events of a run in insertion order, optionally only those
    /// whose kind is `kind` (e.g. `"tool_call"`).
    pub fn load_run(&self, run_id: RunId, kind: Option<&str>) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, timestamp, data FROM events
             WHERE run_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![run_id.to_string(), kind], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, run_id, timestamp, data) = row?;
            events.push(Event {
                id: parse_uuid(&id)?,
                run_id: RunId(parse_uuid(&run_id)?),
                timestamp: parse_time(&timestamp)?,
                kind: serde_json::from_str(&data)?,
            });
        }
        Ok(events)
    }

    /// Every recorded run, newest first.
    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.run_id, s.timestamp, s.data,
                    (SELECT t.timestamp FROM events t
                      WHERE t.run_id = s.run_id AND t.kind IN ('answer', 'failure')
                      ORDER BY t.seq DESC LIMIT 1),
                    (SELECT t.data FROM events t
                      WHERE t.run_id = s.run_id AND t.kind IN ('answer', 'failure')
                      ORDER BY t.seq DESC LIMIT 1),
                    (SELECT COUNT(*) FROM events c
                      WHERE c.run_id = s.run_id AND c.kind = 'tool_call')
             FROM events s
             WHERE s.kind = 'run_start'
             ORDER BY s.seq DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut runs = Vec::new();
        for row in rows {
            let (run_id, started, start_data, ended, end_data, tool_calls) = row?;

            let query = match serde_json::from_str::<EventKind>(&start_data)? {
                EventKind::RunStart { query } => query,
                other => {
                    return Err(Error::Corrupt(format!(
                        "expected run_start, got {}",
                        other.name()
                    )));
                }
            };
            let end: Option<EventKind> = end_data.as_deref().map(serde_json::from_str).transpose()?;
            let status = match end {
                Some(EventKind::Answer { .. }) => RunStatus::Answered,
                Some(EventKind::Failure { error_kind, .. }) => RunStatus::Failed(error_kind),
                _ => RunStatus::Incomplete,
            };

            runs.push(RunSummary {
                id: RunId(parse_uuid(&run_id)?),
                query,
                started_at: parse_time(&started)?,
                ended_at: ended.as_deref().map(parse_time).transpose()?,
                tool_calls: usize::try_from(tool_calls).unwrap_or_default(),
                status,
            });
        }
        Ok(runs)
    }

    /// Whether any event was recorded for `run_id`.
    pub fn contains_run(&self, run_id: RunId) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM events WHERE run_id = ?1 LIMIT 1",
                [run_id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid> {
    s.parse()
        .map_err(|e| Error::Corrupt(format!("bad id `{s}`: {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    s.parse()
        .map_err(|e| Error::Corrupt(format!("bad timestamp `{s}`: {e}")))
}
