use rusqlite::params;
use tallysheet_engine::ExtractedLine;

use crate::{Store, StoreError};

impl Store {
    /// Replace the full extracted-line set for a document in one transaction.
    ///
    /// Re-extraction invalidates downstream judgments, so the document's
    /// approval decisions and validation checks are deleted in the same
    /// transaction before the new lines land.
    pub fn replace_extracted_lines(
        &mut self,
        doc_id: &str,
        lines: &[ExtractedLine],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM approvals WHERE doc_id = ?1", [doc_id])?;
        tx.execute("DELETE FROM validation_checks WHERE doc_id = ?1", [doc_id])?;
        tx.execute("DELETE FROM extracted_lines WHERE doc_id = ?1", [doc_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO extracted_lines
                 (line_id, doc_id, worker, work_date, project, hours, extraction_confidence, raw_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for line in lines {
                stmt.execute(params![
                    line.line_id,
                    doc_id,
                    line.worker,
                    line.work_date,
                    line.project,
                    line.hours,
                    line.extraction_confidence,
                    line.raw_text,
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(doc_id, count = lines.len(), "replaced extracted lines");
        Ok(())
    }

    pub fn extracted_lines(&self, doc_id: &str) -> Result<Vec<ExtractedLine>, StoreError> {
        self.select_lines(
            "SELECT line_id, doc_id, worker, work_date, project, hours, extraction_confidence, raw_text
             FROM extracted_lines WHERE doc_id = ?1 ORDER BY work_date, line_id",
            Some(doc_id),
        )
    }

    pub fn all_extracted_lines(&self) -> Result<Vec<ExtractedLine>, StoreError> {
        self.select_lines(
            "SELECT line_id, doc_id, worker, work_date, project, hours, extraction_confidence, raw_text
             FROM extracted_lines ORDER BY doc_id, work_date, line_id",
            None,
        )
    }

    fn select_lines(
        &self,
        sql: &str,
        doc_id: Option<&str>,
    ) -> Result<Vec<ExtractedLine>, StoreError> {
        let mut stmt = self.conn().prepare(sql)?;
        let map = |row: &rusqlite::Row<'_>| {
            Ok(ExtractedLine {
                line_id: row.get(0)?,
                doc_id: row.get(1)?,
                worker: row.get(2)?,
                work_date: row.get(3)?,
                project: row.get(4)?,
                hours: row.get(5)?,
                extraction_confidence: row.get(6)?,
                raw_text: row.get(7)?,
            })
        };
        let rows = match doc_id {
            Some(id) => stmt.query_map([id], map)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }
}
