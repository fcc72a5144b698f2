//! Durable task ledger.
//!
//! One SQLite database per output directory holds one row per grid block.
//! The ledger is the single source of truth for progress: the planner
//! populates it, the scheduler selects from it and records attempt outcomes,
//! and the verifier requeues blocks that fail re-validation. Every mutation
//! is transactional, so a killed process loses at most the attempt in flight.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Database file name inside the output directory.
pub const STORE_FILE_NAME: &str = "block.db";

/// Errors from the task store. All of these are fatal to the current action.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("task store not found at {0}, run init first")]
    NotInitialized(PathBuf),
}

/// One persisted block task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Stable identity, assigned at creation, never reused.
    pub id: i64,
    /// Source dataset this task was planned against.
    pub input: String,
    /// Deterministic output file name derived from the block offset.
    pub file_name: String,
    /// Remote URL, set only when the completed block was uploaded.
    pub file_url: Option<String>,
    /// Content hash of the downloaded file, set on successful fetch.
    pub file_hash: Option<String>,
    /// True iff the most recent attempt fetched (and hashed) the block.
    pub complete: bool,
    /// Nominal block edge length in output pixels.
    pub block_size: u64,
    /// Block origin in output-pixel space.
    pub x: u64,
    pub y: u64,
    /// Source-pixels-per-output-pixel scale factor.
    pub scale: u64,
    /// Last attempt time in epoch milliseconds; 0 means never attempted.
    pub last_access_ms: i64,
}

/// A block task about to be inserted by the planner.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub input: String,
    pub file_name: String,
    pub block_size: u64,
    pub x: u64,
    pub y: u64,
    pub scale: u64,
}

/// Current epoch time in milliseconds, the ledger's timestamp unit.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// SQLite-backed task ledger.
#[derive(Debug)]
pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    /// Deletes any previous ledger in `output_dir` and creates a fresh one.
    pub fn create(output_dir: &Path) -> Result<Self, StoreError> {
        let db_path = output_dir.join(STORE_FILE_NAME);
        match std::fs::remove_file(&db_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let conn = Connection::open(&db_path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Opens the existing ledger in `output_dir`.
    pub fn open(output_dir: &Path) -> Result<Self, StoreError> {
        let db_path = output_dir.join(STORE_FILE_NAME);
        if !db_path.exists() {
            return Err(StoreError::NotInitialized(db_path));
        }
        let conn = Connection::open(&db_path)?;
        Ok(Self { conn })
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS task (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              input TEXT NOT NULL,
              file_name TEXT NOT NULL UNIQUE,
              file_url TEXT,
              file_hash TEXT,
              complete INTEGER NOT NULL DEFAULT 0,
              block_size INTEGER NOT NULL,
              x INTEGER NOT NULL,
              y INTEGER NOT NULL,
              scale INTEGER NOT NULL,
              last_access_ms INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_task_pending
              ON task(complete, last_access_ms, id);
            "#,
        )?;
        Ok(())
    }

    /// Inserts a batch of tasks in one transaction.
    ///
    /// The planner calls this once per grid row; a crash mid-init leaves a
    /// partial ledger that the next init replaces wholesale.
    pub fn bulk_insert(&mut self, tasks: &[NewTask]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO task(input, file_name, complete, block_size, x, y, scale, last_access_ms)
                VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, 0)
                "#,
            )?;
            for task in tasks {
                stmt.execute(params![
                    task.input,
                    task.file_name,
                    task.block_size,
                    task.x,
                    task.y,
                    task.scale,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// The pending task with the oldest `last_access`, or `None` if all are
    /// complete.
    ///
    /// Never-attempted tasks carry `last_access_ms = 0`, so they always sort
    /// before any previously failed task; ties fall back to insertion order.
    /// A repeatedly failing block is therefore retried only after every other
    /// pending block has had a turn.
    pub fn next_pending(&self) -> Result<Option<TaskRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                r#"
                SELECT id, input, file_name, file_url, file_hash, complete,
                       block_size, x, y, scale, last_access_ms
                FROM task
                WHERE complete = 0
                ORDER BY last_access_ms ASC, id ASC
                LIMIT 1
                "#,
                [],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Records one attempt's outcome and stamps `last_access`.
    pub fn mark_attempt(
        &self,
        id: i64,
        complete: bool,
        file_url: Option<&str>,
        file_hash: Option<&str>,
        timestamp_ms: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            UPDATE task
            SET complete = ?2, file_url = ?3, file_hash = ?4, last_access_ms = ?5
            WHERE id = ?1
            "#,
            params![id, complete, file_url, file_hash, timestamp_ms],
        )?;
        Ok(())
    }

    /// Fraction of tasks with `complete = true`. Progress reporting only.
    pub fn completion_ratio(&self) -> Result<f64, StoreError> {
        let (done, total): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(complete), 0), COUNT(*) FROM task",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if total == 0 {
            return Ok(1.0);
        }
        Ok(done as f64 / total as f64)
    }

    /// Number of tasks still pending.
    pub fn pending_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM task WHERE complete = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Total number of tasks in the ledger.
    pub fn task_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM task", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// All records with `complete = true`, in insertion order.
    pub fn completed_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, input, file_name, file_url, file_hash, complete,
                   block_size, x, y, scale, last_access_ms
            FROM task
            WHERE complete = 1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map([], Self::row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Resets the named tasks to pending, clearing `file_url`/`file_hash`.
    ///
    /// Returns the number of records changed.
    pub fn requeue(&mut self, file_names: &[String]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE task
                SET complete = 0, file_url = NULL, file_hash = NULL
                WHERE file_name = ?1
                "#,
            )?;
            for name in file_names {
                changed += stmt.execute(params![name])?;
            }
        }
        tx.commit()?;
        Ok(changed)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
        Ok(TaskRecord {
            id: row.get("id")?,
            input: row.get("input")?,
            file_name: row.get("file_name")?,
            file_url: row.get("file_url")?,
            file_hash: row.get("file_hash")?,
            complete: row.get("complete")?,
            block_size: row.get::<_, i64>("block_size")? as u64,
            x: row.get::<_, i64>("x")? as u64,
            y: row.get::<_, i64>("y")? as u64,
            scale: row.get::<_, i64>("scale")? as u64,
            last_access_ms: row.get("last_access_ms")?,
        })
    }
}
