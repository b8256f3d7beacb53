use std::collections::HashMap;

use crate::error::EngineError;
use crate::model::{ApprovalDecision, Decision, ExtractedLine, TrustedLedgerEntry};

impl ApprovalDecision {
    /// Shape check before persistence: a CORRECTED decision must override at
    /// least one field, otherwise it changes nothing and the reviewer almost
    /// certainly mis-clicked. A REJECTED decision without a reason is
    /// accepted (a reason is expected, not required); callers may warn.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.decision == Decision::Corrected
            && self.corrected_hours.is_none()
            && self.corrected_date.is_none()
            && self.corrected_project.is_none()
        {
            return Err(EngineError::EmptyCorrection {
                line_id: self.line_id.clone(),
            });
        }
        Ok(())
    }

    /// Shape check plus membership: the decision must reference a line the
    /// document set actually contains.
    pub fn validate_against(&self, lines: &[ExtractedLine]) -> Result<(), EngineError> {
        if !lines.iter().any(|l| l.line_id == self.line_id) {
            return Err(EngineError::UnknownLine {
                line_id: self.line_id.clone(),
            });
        }
        self.validate()
    }
}

/// Recompute the trusted ledger from extracted lines and current decisions.
///
/// Deterministic pure function: UNREVIEWED (no decision) and REJECTED lines
/// are excluded; APPROVED lines carry their original values; CORRECTED lines
/// merge override fields over originals, falling back field-wise. Entries
/// keep the input line order.
pub fn trusted_ledger(
    lines: &[ExtractedLine],
    decisions: &[ApprovalDecision],
) -> Vec<TrustedLedgerEntry> {
    // Last write wins when the same line_id appears more than once
    let by_line: HashMap<&str, &ApprovalDecision> = decisions
        .iter()
        .map(|d| (d.line_id.as_str(), d))
        .collect();

    let mut entries = Vec::new();
    for line in lines {
        let decision = match by_line.get(line.line_id.as_str()) {
            Some(d) => *d,
            None => continue, // UNREVIEWED
        };
        match decision.decision {
            Decision::Rejected => continue,
            Decision::Approved => entries.push(TrustedLedgerEntry {
                line_id: line.line_id.clone(),
                doc_id: line.doc_id.clone(),
                worker: line.worker.clone(),
                work_date: line.parsed_date(),
                project: line.project.clone(),
                hours: line.hours.unwrap_or(0.0),
                decision: Decision::Approved,
            }),
            Decision::Corrected => entries.push(TrustedLedgerEntry {
                line_id: line.line_id.clone(),
                doc_id: line.doc_id.clone(),
                worker: line.worker.clone(),
                work_date: decision.corrected_date.or_else(|| line.parsed_date()),
                project: decision
                    .corrected_project
                    .clone()
                    .unwrap_or_else(|| line.project.clone()),
                hours: decision.corrected_hours.or(line.hours).unwrap_or(0.0),
                decision: Decision::Corrected,
            }),
        }
    }
    entries
}
