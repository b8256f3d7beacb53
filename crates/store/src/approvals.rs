use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use tallysheet_engine::{ApprovalDecision, Decision};

use crate::{Store, StoreError};

impl Store {
    /// Persist one reviewer decision, overwriting any prior decision for the
    /// same line (at most one row per `line_id`). The decision's shape must
    /// already have passed `ApprovalDecision::validate`; the store does not
    /// re-check it.
    pub fn upsert_decision(&mut self, decision: &ApprovalDecision) -> Result<(), StoreError> {
        if decision.decision == Decision::Rejected && decision.reason.is_none() {
            tracing::warn!(line_id = %decision.line_id, "rejection recorded without a reason");
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO approvals
             (line_id, doc_id, decision, corrected_hours, corrected_date, corrected_project, reason, reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                decision.line_id,
                decision.doc_id,
                decision.decision.to_string(),
                decision.corrected_hours,
                decision.corrected_date,
                decision.corrected_project,
                decision.reason,
                decision.reviewed_at,
            ],
        )?;
        Ok(())
    }

    /// Approve every extracted line of a document in one transaction,
    /// overwriting any existing decisions.
    pub fn approve_all(&mut self, doc_id: &str, reviewed_at: DateTime<Utc>) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let count = {
            let mut select = tx.prepare("SELECT line_id FROM extracted_lines WHERE doc_id = ?1")?;
            let line_ids = select
                .query_map([doc_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let mut insert = tx.prepare(
                "INSERT OR REPLACE INTO approvals (line_id, doc_id, decision, reviewed_at)
                 VALUES (?1, ?2, 'APPROVED', ?3)",
            )?;
            for line_id in &line_ids {
                insert.execute(params![line_id, doc_id, reviewed_at])?;
            }
            line_ids.len()
        };
        tx.commit()?;
        tracing::info!(doc_id, count, "approved all lines");
        Ok(count)
    }

    /// Delete every decision for a document; its lines return to UNREVIEWED.
    pub fn clear_decisions(&mut self, doc_id: &str) -> Result<usize, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM approvals WHERE doc_id = ?1", [doc_id])?;
        tracing::info!(doc_id, deleted, "cleared approval decisions");
        Ok(deleted)
    }

    pub fn decisions(&self, doc_id: &str) -> Result<Vec<ApprovalDecision>, StoreError> {
        self.select_decisions(
            "SELECT line_id, doc_id, decision, corrected_hours, corrected_date, corrected_project, reason, reviewed_at
             FROM approvals WHERE doc_id = ?1 ORDER BY line_id",
            Some(doc_id),
        )
    }

    pub fn all_decisions(&self) -> Result<Vec<ApprovalDecision>, StoreError> {
        self.select_decisions(
            "SELECT line_id, doc_id, decision, corrected_hours, corrected_date, corrected_project, reason, reviewed_at
             FROM approvals ORDER BY doc_id, line_id",
            None,
        )
    }

    fn select_decisions(
        &self,
        sql: &str,
        doc_id: Option<&str>,
    ) -> Result<Vec<ApprovalDecision>, StoreError> {
        type Raw = (
            String,
            String,
            String,
            Option<f64>,
            Option<NaiveDate>,
            Option<String>,
            Option<String>,
            DateTime<Utc>,
        );
        let mut stmt = self.conn().prepare(sql)?;
        let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Raw> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        };
        let rows = match doc_id {
            Some(id) => stmt.query_map([id], map)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
        };

        let mut decisions = Vec::with_capacity(rows.len());
        for (line_id, doc_id, decision, corrected_hours, corrected_date, corrected_project, reason, reviewed_at) in
            rows
        {
            let decision = Decision::parse(&decision).ok_or_else(|| {
                StoreError::corrupt("approvals", format!("unknown decision '{decision}'"))
            })?;
            decisions.push(ApprovalDecision {
                line_id,
                doc_id,
                decision,
                corrected_hours,
                corrected_date,
                corrected_project,
                reason,
                reviewed_at,
            });
        }
        Ok(decisions)
    }
}
