//! SQLite warehouse: the raw source, the materialized models, run
//! bookkeeping and data-test results.
//!
//! RULE: Only store/ talks to the database.
//! Models and the engine call store methods; they never execute SQL.

use crate::{
    error::{PipelineError, PipelineResult},
    event::EventLogEntry,
    mart,
    model::{Relation, RAW_CUSTOMER},
    staging,
};
use rusqlite::{params, Connection, OptionalExtension};

mod models;
mod source;
mod test_result;

pub use models::{SegmentSummary, TierCount};

pub struct WarehouseStore {
    conn: Connection,
}

impl WarehouseStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to call on every open.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_source.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_models.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_test_results.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    /// Record a run. A second call for the same id is a no-op.
    pub fn insert_run(&self, run_id: &str, version: &str, started_at: &str) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, version, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, version, started_at],
        )?;
        Ok(())
    }

    pub fn finish_run(&self, run_id: &str, status: &str, finished_at: &str) -> PipelineResult<()> {
        self.conn.execute(
            "UPDATE run SET status = ?1, finished_at = ?2 WHERE run_id = ?3",
            params![status, finished_at, run_id],
        )?;
        Ok(())
    }

    pub fn run_status(&self, run_id: &str) -> PipelineResult<Option<String>> {
        let status = self
            .conn
            .query_row(
                "SELECT status FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, seq, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.seq as i64,
                entry.stage,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> PipelineResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY seq ASC, id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    seq: row.get::<_, i64>(2)? as u64,
                    stage: row.get(3)?,
                    event_type: row.get(4)?,
                    payload: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Relations by name ──────────────────────────────────────

    /// Read a source or model table back as a relation.
    pub fn load_relation(&self, name: &str) -> PipelineResult<Relation> {
        match name {
            RAW_CUSTOMER => Ok(Relation::Raw(self.raw_customers()?)),
            staging::MODEL_NAME => Ok(Relation::Staged(self.stg_customers()?)),
            mart::MODEL_NAME => Ok(Relation::Dimensional(self.dim_customers()?)),
            other => Err(PipelineError::RelationMissing { name: other.to_string() }),
        }
    }

    /// Replace the table backing `relation`. Sources are never written here.
    pub fn materialize(&self, name: &str, relation: &Relation) -> PipelineResult<usize> {
        match relation {
            Relation::Staged(rows) => self.replace_stg_customers(rows),
            Relation::Dimensional(rows) => self.replace_dim_customers(rows),
            Relation::Raw(_) => Err(PipelineError::InvalidConfig(format!(
                "model '{name}' returned raw source rows; sources cannot be materialized"
            ))),
        }
    }
}
