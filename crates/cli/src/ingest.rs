//! CSV ingest for extracted lines and ground truth.
//!
//! Extraction output is loaded leniently: a malformed or empty `hours` cell
//! becomes `None` (validation reports on it later), and rows without a
//! `line_id` get one minted. Ground truth is analyst-entered and parses
//! strictly; a bad row fails the whole load.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tallysheet_engine::{ExtractedLine, GroundTruthLine};
use uuid::Uuid;

use crate::CliError;

#[derive(Debug, Deserialize)]
struct RawLineRow {
    #[serde(default)]
    line_id: Option<String>,
    #[serde(default)]
    worker: String,
    #[serde(default)]
    work_date: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    hours: Option<String>,
    #[serde(default)]
    extraction_confidence: Option<f64>,
    #[serde(default)]
    raw_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TruthRow {
    worker: String,
    work_date: String,
    project: String,
    hours: f64,
    #[serde(default)]
    notes: Option<String>,
}

pub fn load_extracted_csv(doc_id: &str, path: &Path) -> Result<Vec<ExtractedLine>, CliError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let mut lines = Vec::new();
    for (idx, record) in reader.deserialize::<RawLineRow>().enumerate() {
        let row = record
            .map_err(|e| CliError::parse(format!("{} row {}: {e}", path.display(), idx + 1)))?;
        let hours = row.hours.as_deref().and_then(parse_hours_cell);
        let raw_text = row
            .raw_text
            .unwrap_or_else(|| row.hours.clone().unwrap_or_default());
        lines.push(ExtractedLine {
            line_id: match row.line_id {
                Some(id) if !id.trim().is_empty() => id,
                _ => Uuid::new_v4().to_string(),
            },
            doc_id: doc_id.to_string(),
            worker: row.worker,
            work_date: row.work_date,
            project: row.project,
            hours,
            // Rows without a confidence column count as fully confident, so
            // hand-keyed CSVs do not trip the confidence warning
            extraction_confidence: row.extraction_confidence.unwrap_or(1.0),
            raw_text,
        });
    }
    Ok(lines)
}

pub fn load_truth_csv(doc_id: &str, path: &Path) -> Result<Vec<GroundTruthLine>, CliError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let mut lines = Vec::new();
    for (idx, record) in reader.deserialize::<TruthRow>().enumerate() {
        let row = record
            .map_err(|e| CliError::parse(format!("{} row {}: {e}", path.display(), idx + 1)))?;
        let work_date = NaiveDate::parse_from_str(row.work_date.trim(), "%Y-%m-%d")
            .map_err(|_| {
                CliError::parse(format!(
                    "{} row {}: ground truth date '{}' is not YYYY-MM-DD",
                    path.display(),
                    idx + 1,
                    row.work_date
                ))
            })?;
        lines.push(GroundTruthLine {
            doc_id: doc_id.to_string(),
            worker: row.worker,
            work_date,
            project: row.project,
            hours: row.hours,
            notes: row.notes.filter(|n| !n.trim().is_empty()),
        });
    }
    Ok(lines)
}

/// Numeric cell or nothing; "7.5" parses, "" / "N/A" / "eight" do not.
fn parse_hours_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn malformed_hours_load_as_none() {
        let file = write_csv(
            "line_id,worker,work_date,project,hours,extraction_confidence\n\
             l1,Mike Agrawal,2026-01-12,PROJ-A,8.0,0.95\n\
             l2,Mike Agrawal,2026-01-13,PROJ-A,N/A,0.40\n\
             l3,Mike Agrawal,2026-01-14,PROJ-A,,0.90\n",
        );
        let lines = load_extracted_csv("doc_1", file.path()).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].hours, Some(8.0));
        assert_eq!(lines[1].hours, None);
        assert_eq!(lines[1].raw_text, "N/A");
        assert_eq!(lines[2].hours, None);
    }

    #[test]
    fn missing_line_id_is_minted() {
        let file = write_csv(
            "worker,work_date,project,hours\n\
             Mike Agrawal,2026-01-12,PROJ-A,8.0\n",
        );
        let lines = load_extracted_csv("doc_1", file.path()).unwrap();
        assert!(!lines[0].line_id.is_empty());
        assert_eq!(lines[0].extraction_confidence, 1.0);
    }

    #[test]
    fn truth_rejects_bad_dates() {
        let file = write_csv(
            "worker,work_date,project,hours\n\
             Mike Agrawal,01/12/2026,PROJ-A,8.0\n",
        );
        let err = load_truth_csv("doc_1", file.path()).unwrap_err();
        assert!(err.message.contains("not YYYY-MM-DD"));
    }

    #[test]
    fn truth_parses_strictly() {
        let file = write_csv(
            "worker,work_date,project,hours,notes\n\
             Mike Agrawal,2026-01-12,PROJ-A,8.0,half day off\n\
             Mike Agrawal,2026-01-13,PROJ-A,8.0,\n",
        );
        let lines = load_truth_csv("doc_1", file.path()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].notes.as_deref(), Some("half day off"));
        assert_eq!(lines[1].notes, None);
    }
}
