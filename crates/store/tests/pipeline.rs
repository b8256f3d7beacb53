//! End-to-end flow through the store: ingest, validate, compare, review,
//! derive the trusted ledger, reconcile, record history.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tallysheet_engine::{
    compare, reconcile, trusted_ledger, validate, ApprovalDecision, CheckStatus, Decision,
    ExtractedLine, GroundTruthLine, InvoiceTotals, ReconSource, Thresholds,
};
use tallysheet_store::Store;

fn line(id: &str, date: &str, hours: Option<f64>) -> ExtractedLine {
    ExtractedLine {
        line_id: id.into(),
        doc_id: "ts_w03".into(),
        worker: "Mike Agrawal".into(),
        work_date: date.into(),
        project: "PROJ-A".into(),
        hours,
        extraction_confidence: 0.92,
        raw_text: String::new(),
    }
}

fn truth(date: &str, hours: f64) -> GroundTruthLine {
    GroundTruthLine {
        doc_id: "ts_w03".into(),
        worker: "Mike Agrawal".into(),
        work_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        project: "PROJ-A".into(),
        hours,
        notes: None,
    }
}

fn reviewed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 19, 10, 0, 0).unwrap()
}

#[test]
fn full_week_through_the_pipeline() {
    let mut store = Store::open_in_memory().unwrap();
    let thresholds = Thresholds::default();

    // Ingest a five-day week with one mis-read line (10.0 instead of 8.0).
    let lines: Vec<ExtractedLine> = vec![
        line("l1", "2026-01-12", Some(8.0)),
        line("l2", "2026-01-13", Some(8.0)),
        line("l3", "2026-01-14", Some(10.0)),
        line("l4", "2026-01-15", Some(8.0)),
        line("l5", "2026-01-16", Some(8.0)),
    ];
    store.replace_extracted_lines("ts_w03", &lines).unwrap();

    // Validate and persist the checks.
    let stored = store.extracted_lines("ts_w03").unwrap();
    let report = validate("ts_w03", &stored, &thresholds);
    assert_eq!(report.overall_status, CheckStatus::Pass);
    store
        .replace_validation_checks("ts_w03", &report.checks)
        .unwrap();
    assert!(!store.validation_checks("ts_w03").unwrap().is_empty());

    // Ground truth says Wednesday was 8 hours; comparison flags the one key.
    let gt: Vec<GroundTruthLine> = [
        "2026-01-12",
        "2026-01-13",
        "2026-01-14",
        "2026-01-15",
        "2026-01-16",
    ]
    .iter()
    .map(|d| truth(d, 8.0))
    .collect();
    store.replace_ground_truth("ts_w03", &gt).unwrap();
    let accuracy = compare(
        "ts_w03",
        &stored,
        &store.ground_truth("ts_w03").unwrap(),
        &thresholds,
    );
    assert_eq!(accuracy.matched, 4);
    assert_eq!(accuracy.discrepancies, 1);

    // Reviewer corrects the bad line and approves the rest.
    store.approve_all("ts_w03", reviewed_at()).unwrap();
    let correction = ApprovalDecision {
        line_id: "l3".into(),
        doc_id: "ts_w03".into(),
        decision: Decision::Corrected,
        corrected_hours: Some(8.0),
        corrected_date: None,
        corrected_project: None,
        reason: Some("tally mark misread".into()),
        reviewed_at: reviewed_at(),
    };
    correction.validate().unwrap();
    store.upsert_decision(&correction).unwrap();

    // Trusted ledger applies the correction over the stored lines.
    let ledger = trusted_ledger(&stored, &store.decisions("ts_w03").unwrap());
    assert_eq!(ledger.len(), 5);
    let total: f64 = ledger.iter().map(|e| e.hours).sum();
    assert_eq!(total, 40.0);

    // Reconcile the month against a matching invoice and record the run.
    let recon_lines: Vec<_> = ledger.iter().filter_map(|e| e.recon_line()).collect();
    let invoices = InvoiceTotals {
        subsub: Some(6000.0),
        prime: None,
    };
    let summaries = reconcile(&recon_lines, &invoices, 150.0, 1.0, ReconSource::Trusted);
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].within_tolerance);
    store
        .append_recon_summary(&summaries[0], reviewed_at())
        .unwrap();
    assert_eq!(store.recon_history().unwrap().len(), 1);

    let status = store.pipeline_status().unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].line_count, 5);
    assert_eq!(status[0].approval_count, 5);
    assert_eq!(status[0].validation.as_deref(), Some("PASS"));
}

#[test]
fn reextraction_invalidates_checks_and_decisions() {
    let mut store = Store::open_in_memory().unwrap();
    let thresholds = Thresholds::default();

    let first = vec![line("l1", "2026-01-12", Some(8.0))];
    store.replace_extracted_lines("ts_w03", &first).unwrap();
    let report = validate("ts_w03", &first, &thresholds);
    store
        .replace_validation_checks("ts_w03", &report.checks)
        .unwrap();
    store.approve_all("ts_w03", reviewed_at()).unwrap();
    assert!(!store.validation_checks("ts_w03").unwrap().is_empty());
    assert_eq!(store.decisions("ts_w03").unwrap().len(), 1);

    // Re-ingest: prior checks and decisions must not survive, or stale
    // judgments would apply to different lines.
    let second = vec![
        line("l6", "2026-01-12", Some(4.0)),
        line("l7", "2026-01-12", Some(4.0)),
    ];
    store.replace_extracted_lines("ts_w03", &second).unwrap();
    assert!(store.validation_checks("ts_w03").unwrap().is_empty());
    assert!(store.decisions("ts_w03").unwrap().is_empty());
    assert_eq!(store.extracted_lines("ts_w03").unwrap().len(), 2);
}

#[test]
fn rejected_lines_never_reach_reconciliation() {
    let mut store = Store::open_in_memory().unwrap();

    let lines = vec![
        line("l1", "2026-01-12", Some(8.0)),
        line("l2", "2026-01-13", Some(8.0)),
    ];
    store.replace_extracted_lines("ts_w03", &lines).unwrap();
    store
        .upsert_decision(&ApprovalDecision {
            line_id: "l1".into(),
            doc_id: "ts_w03".into(),
            decision: Decision::Approved,
            corrected_hours: None,
            corrected_date: None,
            corrected_project: None,
            reason: None,
            reviewed_at: reviewed_at(),
        })
        .unwrap();
    store
        .upsert_decision(&ApprovalDecision {
            line_id: "l2".into(),
            doc_id: "ts_w03".into(),
            decision: Decision::Rejected,
            corrected_hours: None,
            corrected_date: None,
            corrected_project: None,
            reason: Some("duplicate entry".into()),
            reviewed_at: reviewed_at(),
        })
        .unwrap();

    let ledger = trusted_ledger(
        &store.extracted_lines("ts_w03").unwrap(),
        &store.decisions("ts_w03").unwrap(),
    );
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].line_id, "l1");

    let recon_lines: Vec<_> = ledger.iter().filter_map(|e| e.recon_line()).collect();
    let summaries = reconcile(
        &recon_lines,
        &InvoiceTotals::default(),
        150.0,
        1.0,
        ReconSource::Trusted,
    );
    assert_eq!(summaries[0].approved_hours, 8.0);
}
