use rusqlite::params;
use tallysheet_engine::GroundTruthLine;

use crate::{Store, StoreError};

impl Store {
    /// Replace a document's ground truth (delete-then-insert, never merge).
    pub fn replace_ground_truth(
        &mut self,
        doc_id: &str,
        lines: &[GroundTruthLine],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM ground_truth_lines WHERE doc_id = ?1", [doc_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ground_truth_lines (doc_id, worker, work_date, project, hours, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for line in lines {
                stmt.execute(params![
                    doc_id,
                    line.worker,
                    line.work_date,
                    line.project,
                    line.hours,
                    line.notes,
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(doc_id, count = lines.len(), "replaced ground truth");
        Ok(())
    }

    pub fn ground_truth(&self, doc_id: &str) -> Result<Vec<GroundTruthLine>, StoreError> {
        let mut stmt = self.conn().prepare(
            "SELECT doc_id, worker, work_date, project, hours, notes
             FROM ground_truth_lines WHERE doc_id = ?1 ORDER BY work_date, project, rowid",
        )?;
        let lines = stmt
            .query_map([doc_id], |row| {
                Ok(GroundTruthLine {
                    doc_id: row.get(0)?,
                    worker: row.get(1)?,
                    work_date: row.get(2)?,
                    project: row.get(3)?,
                    hours: row.get(4)?,
                    notes: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}
