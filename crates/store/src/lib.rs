//! `tallysheet-store` — SQLite persistence for the timesheet pipeline.
//!
//! Every write for a document is a single transaction with replace-set
//! semantics: delete all rows for the key, then insert the new set. Rerunning
//! any stage therefore produces the same persisted state as the first run,
//! and no reader ever observes an empty-then-partial document. Replacing a
//! document's extracted lines also deletes its validation checks and approval
//! decisions — re-extraction invalidates every downstream judgment.
//!
//! No business logic lives here; decision-shape validation and all derived
//! computation belong to `tallysheet-engine`.

mod approvals;
mod checks;
mod error;
mod history;
mod lines;
mod truth;

pub use error::StoreError;
pub use history::ReconRun;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

const BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS extracted_lines (
    line_id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL,
    worker TEXT NOT NULL DEFAULT '',
    work_date TEXT NOT NULL DEFAULT '',   -- raw extractor output, validated later
    project TEXT NOT NULL DEFAULT '',
    hours REAL,                           -- NULL = missing/non-numeric in source
    extraction_confidence REAL NOT NULL DEFAULT 0,
    raw_text TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_extracted_doc ON extracted_lines(doc_id);

CREATE TABLE IF NOT EXISTS ground_truth_lines (
    doc_id TEXT NOT NULL,
    worker TEXT NOT NULL,
    work_date TEXT NOT NULL,
    project TEXT NOT NULL,
    hours REAL NOT NULL,                  -- a day/project may be split across rows; comparison sums them
    notes TEXT
);
CREATE INDEX IF NOT EXISTS idx_truth_doc ON ground_truth_lines(doc_id);

CREATE TABLE IF NOT EXISTS validation_checks (
    doc_id TEXT NOT NULL,
    rule_name TEXT NOT NULL,
    status TEXT NOT NULL,
    details TEXT NOT NULL,
    computed_value TEXT,
    line_id TEXT                          -- NULL for document-scoped checks
);
CREATE INDEX IF NOT EXISTS idx_checks_doc ON validation_checks(doc_id);

CREATE TABLE IF NOT EXISTS approvals (
    line_id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL,
    decision TEXT NOT NULL,
    corrected_hours REAL,
    corrected_date TEXT,
    corrected_project TEXT,
    reason TEXT,
    reviewed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_approvals_doc ON approvals(doc_id);

CREATE TABLE IF NOT EXISTS recon_summary (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_at TEXT NOT NULL,
    period_month TEXT NOT NULL,
    period_quarter TEXT NOT NULL,
    approved_hours REAL NOT NULL,
    hourly_rate REAL NOT NULL,
    implied_cost REAL NOT NULL,
    invoice_subsub_amount REAL,
    invoice_prime_amount REAL,
    variance_subsub REAL,
    variance_subsub_pct REAL,
    variance_prime REAL,
    variance_prime_pct REAL,
    variance_tolerance_pct REAL NOT NULL,
    within_tolerance INTEGER NOT NULL,
    exception_details TEXT,
    data_source TEXT NOT NULL
);
"#;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // PRAGMAs are per-connection; keep them uniform across every open
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Distinct document ids with any extracted lines, sorted.
    pub fn document_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT doc_id FROM extracted_lines ORDER BY doc_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Per-document pipeline status: row counts per stage plus the latest
    /// overall validation status, for tabular display.
    pub fn pipeline_status(&self) -> Result<Vec<DocStatus>, StoreError> {
        let mut out = Vec::new();
        for doc_id in self.document_ids()? {
            let lines: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM extracted_lines WHERE doc_id = ?1",
                [&doc_id],
                |r| r.get(0),
            )?;
            let truth: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM ground_truth_lines WHERE doc_id = ?1",
                [&doc_id],
                |r| r.get(0),
            )?;
            let checks: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM validation_checks WHERE doc_id = ?1",
                [&doc_id],
                |r| r.get(0),
            )?;
            let failed: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM validation_checks WHERE doc_id = ?1 AND status = 'FAIL'",
                [&doc_id],
                |r| r.get(0),
            )?;
            let warned: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM validation_checks WHERE doc_id = ?1 AND status = 'WARN'",
                [&doc_id],
                |r| r.get(0),
            )?;
            let approvals: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM approvals WHERE doc_id = ?1",
                [&doc_id],
                |r| r.get(0),
            )?;
            let validation = if checks == 0 {
                None
            } else if failed > 0 {
                Some("FAIL".to_string())
            } else if warned > 0 {
                Some("WARN".to_string())
            } else {
                Some("PASS".to_string())
            };
            out.push(DocStatus {
                doc_id,
                line_count: lines as usize,
                ground_truth_count: truth as usize,
                check_count: checks as usize,
                validation,
                approval_count: approvals as usize,
            });
        }
        Ok(out)
    }
}

/// One row of the pipeline status read-model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocStatus {
    pub doc_id: String,
    pub line_count: usize,
    pub ground_truth_count: usize,
    pub check_count: usize,
    pub validation: Option<String>,
    pub approval_count: usize,
}
