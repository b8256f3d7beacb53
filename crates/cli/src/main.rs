// tally - timesheet validation, accuracy matching and reconciliation CLI

mod exit_codes;
mod ingest;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use tallysheet_engine::{
    compare, reconcile, trusted_ledger, validate, ApprovalDecision, CheckStatus, Decision,
    EngineConfig, InvoiceTotals, ReconLine, ReconSource, TrustedLedgerEntry,
};
use tallysheet_store::Store;

use exit_codes::{
    EXIT_COMPARE_MISMATCH, EXIT_ERROR, EXIT_IO_ERROR, EXIT_PARSE_ERROR, EXIT_RECON_BREACH,
    EXIT_SUCCESS, EXIT_USAGE, EXIT_VALIDATION_FAILED,
};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Validate, match and reconcile extracted timesheets")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "tally.db")]
    db: PathBuf,

    /// Config file (thresholds and reconciliation defaults)
    #[arg(long, global = true, default_value = "tally.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load extracted timesheet lines from CSV (replaces the document's set)
    #[command(after_help = "\
Examples:
  tally ingest ts_w03 extracted/ts_w03.csv
  tally ingest ts_w03 extracted/ts_w03.csv --db audit.db

Re-ingesting a document deletes its validation checks and approval
decisions; re-run validate and review afterwards.")]
    Ingest {
        /// Document id
        doc_id: String,
        /// CSV with columns: line_id,worker,work_date,project,hours,extraction_confidence,raw_text
        lines: PathBuf,
    },

    /// Load analyst ground truth from CSV (replaces the document's set)
    #[command(after_help = "\
Examples:
  tally truth ts_w03 truth/ts_w03.csv")]
    Truth {
        /// Document id
        doc_id: String,
        /// CSV with columns: worker,work_date,project,hours,notes
        truth: PathBuf,
    },

    /// Run validation rules and persist the checks
    #[command(after_help = "\
Examples:
  tally validate ts_w03
  tally validate ts_w03 --json
  tally validate ts_w03 --output validation_results.json

Exit 3 when the overall status is FAIL; warnings exit 0.")]
    Validate {
        doc_id: String,
        #[arg(long)]
        json: bool,
        /// Also write the report as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Compare extracted lines against ground truth
    #[command(after_help = "\
Examples:
  tally compare ts_w03
  tally compare ts_w03 --json

Exit 4 when any key is not a MATCH.")]
    Compare {
        doc_id: String,
        #[arg(long)]
        json: bool,
    },

    /// Record reviewer decisions
    Approve {
        #[command(subcommand)]
        command: ApproveCommands,
    },

    /// Print the trusted ledger (approved and corrected lines)
    #[command(after_help = "\
Examples:
  tally ledger
  tally ledger --doc ts_w03 --json")]
    Ledger {
        /// Restrict to one document
        #[arg(long)]
        doc: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Reconcile trusted hours against invoice totals
    #[command(after_help = "\
Examples:
  tally reconcile --month 2026-01 --subsub 6060 --rate 150
  tally reconcile --month 2026-01 --subsub 6060 --prime 6600 --tolerance 0.5
  tally reconcile --source raw --json

Flag defaults come from tally.toml when present. Every run is appended
to history. Exit 5 when any variance is outside tolerance.")]
    Reconcile {
        /// Restrict to one calendar month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Sub-sub contractor invoice total
        #[arg(long)]
        subsub: Option<f64>,
        /// Prime invoice total
        #[arg(long)]
        prime: Option<f64>,
        /// Hourly rate
        #[arg(long)]
        rate: Option<f64>,
        /// Variance tolerance in percent
        #[arg(long)]
        tolerance: Option<f64>,
        /// Line source: trusted or raw
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        json: bool,
        /// Also write the summaries as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List past reconciliation runs
    History {
        #[arg(long)]
        json: bool,
    },

    /// Per-document pipeline status
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ApproveCommands {
    /// Approve every line of a document
    All { doc_id: String },

    /// Decide one line: approve, reject, or correct
    #[command(after_help = "\
Examples:
  tally approve line ts_w03 a1b2c3
  tally approve line ts_w03 a1b2c3 --reject --reason 'duplicate entry'
  tally approve line ts_w03 a1b2c3 --hours 6.5 --reason 'tally mark misread'
  tally approve line ts_w03 a1b2c3 --date 2026-01-14 --project PROJ-B

Any of --hours/--date/--project makes the decision CORRECTED;
--reject makes it REJECTED; otherwise it is APPROVED.
Re-deciding a line overwrites the previous decision.")]
    Line {
        doc_id: String,
        line_id: String,
        /// Reject the line instead of approving
        #[arg(long, conflicts_with_all = ["hours", "date", "project"])]
        reject: bool,
        /// Corrected hours
        #[arg(long)]
        hours: Option<f64>,
        /// Corrected work date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Corrected project code
        #[arg(long)]
        project: Option<String>,
        /// Reviewer's reason (expected for rejections)
        #[arg(long)]
        reason: Option<String>,
    },

    /// Remove every decision for a document (lines return to unreviewed)
    Clear { doc_id: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest { doc_id, lines } => cmd_ingest(&cli.db, &doc_id, &lines),
        Commands::Truth { doc_id, truth } => cmd_truth(&cli.db, &doc_id, &truth),
        Commands::Validate {
            doc_id,
            json,
            output,
        } => cmd_validate(&cli.db, &cli.config, &doc_id, json, output.as_deref()),
        Commands::Compare { doc_id, json } => cmd_compare(&cli.db, &cli.config, &doc_id, json),
        Commands::Approve { command } => match command {
            ApproveCommands::All { doc_id } => cmd_approve_all(&cli.db, &doc_id),
            ApproveCommands::Line {
                doc_id,
                line_id,
                reject,
                hours,
                date,
                project,
                reason,
            } => cmd_approve_line(&cli.db, &doc_id, &line_id, reject, hours, date, project, reason),
            ApproveCommands::Clear { doc_id } => cmd_approve_clear(&cli.db, &doc_id),
        },
        Commands::Ledger { doc, json } => cmd_ledger(&cli.db, doc.as_deref(), json),
        Commands::Reconcile {
            month,
            subsub,
            prime,
            rate,
            tolerance,
            source,
            json,
            output,
        } => cmd_reconcile(
            &cli.db,
            &cli.config,
            month.as_deref(),
            InvoiceTotals { subsub, prime },
            rate,
            tolerance,
            source.as_deref(),
            json,
            output.as_deref(),
        ),
        Commands::History { json } => cmd_history(&cli.db, json),
        Commands::Status { json } => cmd_status(&cli.db, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_ingest(db: &Path, doc_id: &str, csv_path: &Path) -> Result<(), CliError> {
    let lines = ingest::load_extracted_csv(doc_id, csv_path)?;
    let mut store = open_store(db)?;
    store
        .replace_extracted_lines(doc_id, &lines)
        .map_err(CliError::store)?;
    let missing = lines.iter().filter(|l| l.hours.is_none()).count();
    println!("ingested {} lines for {doc_id}", lines.len());
    if missing > 0 {
        println!("  {missing} lines have missing or non-numeric hours");
    }
    Ok(())
}

fn cmd_truth(db: &Path, doc_id: &str, csv_path: &Path) -> Result<(), CliError> {
    let lines = ingest::load_truth_csv(doc_id, csv_path)?;
    let mut store = open_store(db)?;
    store
        .replace_ground_truth(doc_id, &lines)
        .map_err(CliError::store)?;
    println!("saved {} ground truth lines for {doc_id}", lines.len());
    Ok(())
}

fn cmd_validate(
    db: &Path,
    config_path: &Path,
    doc_id: &str,
    json: bool,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let mut store = open_store(db)?;
    let lines = store.extracted_lines(doc_id).map_err(CliError::store)?;
    if lines.is_empty() {
        return Err(CliError::args(format!("no extracted lines for '{doc_id}'"))
            .with_hint(format!("run: tally ingest {doc_id} <lines.csv>")));
    }

    let report = validate(doc_id, &lines, &config.thresholds);
    store
        .replace_validation_checks(doc_id, &report.checks)
        .map_err(CliError::store)?;

    if let Some(path) = output {
        output::write_json_file(path, &report)?;
    }
    if json {
        output::print_json(&report)?;
    } else {
        output::render_validation(&report);
    }

    if report.overall_status == CheckStatus::Fail {
        return Err(CliError::silent(EXIT_VALIDATION_FAILED));
    }
    Ok(())
}

fn cmd_compare(db: &Path, config_path: &Path, doc_id: &str, json: bool) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let store = open_store(db)?;
    let lines = store.extracted_lines(doc_id).map_err(CliError::store)?;
    let truth = store.ground_truth(doc_id).map_err(CliError::store)?;
    if truth.is_empty() {
        return Err(CliError::args(format!("no ground truth for '{doc_id}'"))
            .with_hint(format!("run: tally truth {doc_id} <truth.csv>")));
    }

    let report = compare(doc_id, &lines, &truth, &config.thresholds);
    if json {
        output::print_json(&report)?;
    } else {
        output::render_accuracy(&report);
    }

    if report.discrepancies + report.missing_extracted + report.extra_extracted > 0 {
        return Err(CliError::silent(EXIT_COMPARE_MISMATCH));
    }
    Ok(())
}

fn cmd_approve_all(db: &Path, doc_id: &str) -> Result<(), CliError> {
    let mut store = open_store(db)?;
    let count = store
        .approve_all(doc_id, Utc::now())
        .map_err(CliError::store)?;
    if count == 0 {
        return Err(CliError::args(format!("no extracted lines for '{doc_id}'")));
    }
    println!("approved {count} lines of {doc_id}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_approve_line(
    db: &Path,
    doc_id: &str,
    line_id: &str,
    reject: bool,
    hours: Option<f64>,
    date: Option<String>,
    project: Option<String>,
    reason: Option<String>,
) -> Result<(), CliError> {
    let corrected_date = match date {
        Some(d) => Some(
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map_err(|_| CliError::args(format!("--date '{d}' is not YYYY-MM-DD")))?,
        ),
        None => None,
    };
    let decision_kind = if reject {
        Decision::Rejected
    } else if hours.is_some() || corrected_date.is_some() || project.is_some() {
        Decision::Corrected
    } else {
        Decision::Approved
    };
    let decision = ApprovalDecision {
        line_id: line_id.to_string(),
        doc_id: doc_id.to_string(),
        decision: decision_kind,
        corrected_hours: hours,
        corrected_date,
        corrected_project: project,
        reason,
        reviewed_at: Utc::now(),
    };

    let mut store = open_store(db)?;
    let lines = store.extracted_lines(doc_id).map_err(CliError::store)?;
    decision
        .validate_against(&lines)
        .map_err(|e| CliError::args(e.to_string()))?;
    if decision.decision == Decision::Rejected && decision.reason.is_none() {
        eprintln!("note: rejection without --reason; the ledger will not explain it");
    }
    store.upsert_decision(&decision).map_err(CliError::store)?;
    println!("{} {line_id} of {doc_id}", decision.decision);
    Ok(())
}

fn cmd_approve_clear(db: &Path, doc_id: &str) -> Result<(), CliError> {
    let mut store = open_store(db)?;
    let deleted = store.clear_decisions(doc_id).map_err(CliError::store)?;
    println!("cleared {deleted} decisions for {doc_id}");
    Ok(())
}

fn cmd_ledger(db: &Path, doc: Option<&str>, json: bool) -> Result<(), CliError> {
    let store = open_store(db)?;
    let entries = ledger_entries(&store, doc)?;
    if json {
        output::print_json(&entries)?;
    } else {
        output::render_ledger(&entries);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_reconcile(
    db: &Path,
    config_path: &Path,
    month: Option<&str>,
    invoices: InvoiceTotals,
    rate: Option<f64>,
    tolerance: Option<f64>,
    source: Option<&str>,
    json: bool,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let rate = rate.unwrap_or(config.reconcile.hourly_rate);
    let tolerance = tolerance.unwrap_or(config.reconcile.tolerance_pct);
    let source = match source {
        Some(s) => ReconSource::parse(s)
            .ok_or_else(|| CliError::args(format!("--source '{s}' is not 'trusted' or 'raw'")))?,
        None => config.reconcile.source,
    };
    let month_filter = match month {
        Some(m) => Some(parse_month(m)?),
        None => None,
    };

    let mut store = open_store(db)?;
    let mut lines = recon_lines(&store, source)?;
    if let Some((year, mon)) = month_filter {
        lines.retain(|l| l.work_date.year() == year && l.work_date.month() == mon);
    }

    let summaries = reconcile(&lines, &invoices, rate, tolerance, source);
    // Invoice totals cover one billing period; refuse rather than silently
    // reconcile multi-month hours with no invoice attached
    if !invoices.is_empty() && summaries.len() > 1 {
        return Err(CliError::args(format!(
            "invoice totals cover one billing period but the lines span {} months",
            summaries.len()
        ))
        .with_hint("pass --month YYYY-MM to reconcile a single period"));
    }
    let run_at = Utc::now();
    for summary in &summaries {
        store
            .append_recon_summary(summary, run_at)
            .map_err(CliError::store)?;
    }

    if let Some(path) = output_path {
        output::write_json_file(path, &summaries)?;
    }
    if json {
        output::print_json(&summaries)?;
    } else {
        for summary in &summaries {
            output::render_summary(summary);
        }
    }

    if summaries.iter().any(|s| !s.within_tolerance) {
        return Err(CliError::silent(EXIT_RECON_BREACH));
    }
    Ok(())
}

fn cmd_history(db: &Path, json: bool) -> Result<(), CliError> {
    let store = open_store(db)?;
    let runs = store.recon_history().map_err(CliError::store)?;
    if json {
        output::print_json(&runs)?;
    } else {
        output::render_history(&runs);
    }
    Ok(())
}

fn cmd_status(db: &Path, json: bool) -> Result<(), CliError> {
    let store = open_store(db)?;
    let rows = store.pipeline_status().map_err(CliError::store)?;
    if json {
        output::print_json(&rows)?;
    } else {
        output::render_status(&rows);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_store(db: &Path) -> Result<Store, CliError> {
    Store::open(db).map_err(|e| CliError::io(format!("cannot open {}: {e}", db.display())))
}

fn load_config(path: &Path) -> Result<EngineConfig, CliError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(EngineConfig::default());
    }
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    EngineConfig::from_toml(&text)
        .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
}

fn ledger_entries(store: &Store, doc: Option<&str>) -> Result<Vec<TrustedLedgerEntry>, CliError> {
    let (lines, decisions) = match doc {
        Some(doc_id) => (
            store.extracted_lines(doc_id).map_err(CliError::store)?,
            store.decisions(doc_id).map_err(CliError::store)?,
        ),
        None => (
            store.all_extracted_lines().map_err(CliError::store)?,
            store.all_decisions().map_err(CliError::store)?,
        ),
    };
    Ok(trusted_ledger(&lines, &decisions))
}

/// Dated lines for reconciliation, from the chosen source. Undated lines
/// cannot belong to a period and are dropped with a note on stderr.
fn recon_lines(store: &Store, source: ReconSource) -> Result<Vec<ReconLine>, CliError> {
    match source {
        ReconSource::Trusted => {
            let entries = ledger_entries(store, None)?;
            let dated: Vec<ReconLine> = entries.iter().filter_map(|e| e.recon_line()).collect();
            let dropped = entries.len() - dated.len();
            if dropped > 0 {
                tracing::warn!(dropped, "trusted lines without a usable date excluded");
            }
            Ok(dated)
        }
        ReconSource::Raw => {
            let lines = store.all_extracted_lines().map_err(CliError::store)?;
            let dated: Vec<ReconLine> = lines
                .iter()
                .filter_map(|l| {
                    Some(ReconLine {
                        worker: l.worker.clone(),
                        work_date: l.parsed_date()?,
                        project: l.project.clone(),
                        hours: l.hours?,
                    })
                })
                .collect();
            let dropped = lines.len() - dated.len();
            if dropped > 0 {
                tracing::warn!(dropped, "raw lines without a usable date or hours excluded");
            }
            Ok(dated)
        }
    }
}

fn parse_month(s: &str) -> Result<(i32, u32), CliError> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| CliError::args(format!("--month '{s}' is not YYYY-MM")))?;
    Ok((date.year(), date.month()))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_IO_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_PARSE_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn store(err: tallysheet_store::StoreError) -> Self {
        Self::error(err.to_string())
    }

    /// The report already told the story; carry only the exit code.
    pub fn silent(code: u8) -> Self {
        Self {
            code,
            message: String::new(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallysheet_engine::ExtractedLine;

    fn line(id: &str, date: &str) -> ExtractedLine {
        ExtractedLine {
            line_id: id.into(),
            doc_id: "ts_1".into(),
            worker: "Mike Agrawal".into(),
            work_date: date.into(),
            project: "PROJ-A".into(),
            hours: Some(8.0),
            extraction_confidence: 0.9,
            raw_text: String::new(),
        }
    }

    #[test]
    fn reconcile_refuses_invoices_spanning_months() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tally.db");
        {
            let mut store = Store::open(&db).unwrap();
            store
                .replace_extracted_lines("ts_1", &[line("l1", "2026-01-12"), line("l2", "2026-02-02")])
                .unwrap();
            store.approve_all("ts_1", Utc::now()).unwrap();
        }

        // 8h x 150/h in January; the invoice matches that month exactly
        let invoices = InvoiceTotals {
            subsub: Some(1200.0),
            prime: None,
        };
        let err = cmd_reconcile(
            &db,
            Path::new("/nonexistent/tally.toml"),
            None,
            invoices,
            None,
            None,
            None,
            false,
            None,
        )
        .unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(err.hint.as_deref().unwrap_or("").contains("--month"));

        // Restricting to one month makes the same invoice reconcilable
        cmd_reconcile(
            &db,
            Path::new("/nonexistent/tally.toml"),
            Some("2026-01"),
            invoices,
            None,
            None,
            None,
            false,
            None,
        )
        .unwrap();
    }

    #[test]
    fn month_parses_and_rejects() {
        assert_eq!(parse_month("2026-01").unwrap(), (2026, 1));
        assert_eq!(parse_month(" 2026-12 ").unwrap(), (2026, 12));
        assert!(parse_month("2026").is_err());
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("Jan 2026").is_err());
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let config = load_config(Path::new("/nonexistent/tally.toml")).unwrap();
        assert_eq!(config.reconcile.hourly_rate, 150.0);
        assert_eq!(config.thresholds.max_weekly_hours, 60.0);
    }

    #[test]
    fn bad_config_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        fs::write(&path, "[thresholds]\nhours_epsilon = 0.0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE_ERROR);
    }
}
