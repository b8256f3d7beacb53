//! Human and JSON rendering for reports.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Datelike;
use serde::Serialize;
use tallysheet_engine::{
    AccuracyReport, ReconciliationSummary, TrustedLedgerEntry, ValidationReport,
};
use tallysheet_store::{DocStatus, ReconRun};

use crate::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::error(format!("serialization failed: {e}")))?;
    println!("{text}");
    Ok(())
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::error(format!("serialization failed: {e}")))?;
    fs::write(path, text)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn render_validation(report: &ValidationReport) {
    println!("document {} - overall {}", report.doc_id, report.overall_status);
    println!(
        "  lines: {} valid, {} invalid, {} warnings",
        report.valid_line_count, report.invalid_line_count, report.warnings_count
    );
    for check in &report.checks {
        let scope = match &check.line_id {
            Some(id) => format!(" [{id}]"),
            None => String::new(),
        };
        println!("  {:4} {}{}: {}", check.status.to_string(), check.rule, scope, check.details);
    }
}

pub fn render_accuracy(report: &AccuracyReport) {
    println!(
        "document {} - {:.1}% hours accuracy ({:.2}h extracted vs {:.2}h truth)",
        report.doc_id, report.hours_accuracy_pct, report.total_ext_hours, report.total_gt_hours
    );
    println!(
        "  {} match, {} discrepancy, {} missing, {} extra",
        report.matched, report.discrepancies, report.missing_extracted, report.extra_extracted
    );
    for cmp in &report.comparisons {
        println!(
            "  {:17} {} / {}: {}",
            cmp.status.to_string(),
            cmp.work_date,
            cmp.project,
            cmp.details
        );
    }
}

pub fn render_ledger(entries: &[TrustedLedgerEntry]) {
    if entries.is_empty() {
        println!("trusted ledger is empty (no approved or corrected lines)");
        return;
    }
    println!("trusted ledger ({} lines)", entries.len());
    for entry in entries {
        let date = entry
            .work_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "(no date)".to_string());
        println!(
            "  {} {:10} {:6.2}h {} [{}] {}",
            date, entry.project, entry.hours, entry.worker, entry.decision, entry.line_id
        );
    }

    // Rollups over the same trusted set
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_project: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in entries {
        if let Some(date) = entry.work_date {
            *by_month
                .entry(format!("{:04}-{:02}", date.year(), date.month()))
                .or_insert(0.0) += entry.hours;
        }
        *by_project.entry(entry.project.as_str()).or_insert(0.0) += entry.hours;
    }
    println!("by month:");
    for (month, hours) in &by_month {
        println!("  {month}: {hours:.2}h");
    }
    println!("by project:");
    for (project, hours) in &by_project {
        println!("  {project}: {hours:.2}h");
    }
}

pub fn render_summary(summary: &ReconciliationSummary) {
    println!(
        "{} ({}) - {:.2}h x {:.2}/h = {:.2} [{}]",
        summary.period_month,
        summary.period_quarter,
        summary.approved_hours,
        summary.hourly_rate,
        summary.implied_cost,
        summary.data_source
    );
    render_invoice_line("sub-sub", summary.invoice_subsub_amount, summary.variance_subsub, summary.variance_subsub_pct);
    render_invoice_line("prime", summary.invoice_prime_amount, summary.variance_prime, summary.variance_prime_pct);
    if summary.within_tolerance {
        println!("  within tolerance ({}%)", summary.variance_tolerance_pct);
    } else if let Some(details) = &summary.exception_details {
        println!("  OUT OF TOLERANCE: {details}");
    }
}

fn render_invoice_line(name: &str, amount: Option<f64>, variance: Option<f64>, pct: Option<f64>) {
    let Some(amount) = amount else { return };
    let variance = variance.unwrap_or(0.0);
    match pct {
        Some(pct) => println!("  {name} invoice {amount:.2}: variance {variance:+.2} ({pct:+.2}%)"),
        None => println!("  {name} invoice {amount:.2}: variance {variance:+.2} (pct undefined)"),
    }
}

pub fn render_history(runs: &[ReconRun]) {
    if runs.is_empty() {
        println!("no reconciliation runs recorded");
        return;
    }
    for run in runs {
        let flag = if run.summary.within_tolerance { "ok" } else { "BREACH" };
        println!(
            "#{} {} {} {:.2}h -> {:.2} [{}] {}",
            run.id,
            run.run_at.format("%Y-%m-%d %H:%M"),
            run.summary.period_month,
            run.summary.approved_hours,
            run.summary.implied_cost,
            run.summary.data_source,
            flag
        );
    }
}

pub fn render_status(rows: &[DocStatus]) {
    if rows.is_empty() {
        println!("no documents ingested");
        return;
    }
    println!(
        "{:<16} {:>6} {:>6} {:>7} {:>10} {:>10}",
        "document", "lines", "truth", "checks", "validation", "decisions"
    );
    for row in rows {
        println!(
            "{:<16} {:>6} {:>6} {:>7} {:>10} {:>10}",
            row.doc_id,
            row.line_count,
            row.ground_truth_count,
            row.check_count,
            row.validation.as_deref().unwrap_or("-"),
            row.approval_count
        );
    }
}
