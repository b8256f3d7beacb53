//! `tallysheet-engine` — Timesheet validation, accuracy-matching and
//! reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded line records, returns reports.
//! No database or CLI dependencies. Every entry point is a deterministic
//! function of its arguments — the persistence layer lives in
//! `tallysheet-store`, the orchestration in `tallysheet-cli`.

pub mod compare;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod reconcile;
pub mod validate;

pub use compare::compare;
pub use config::{EngineConfig, ReconcileDefaults, Thresholds};
pub use error::EngineError;
pub use ledger::trusted_ledger;
pub use model::{
    AccuracyReport, ApprovalDecision, CheckStatus, Decision, ExtractedLine, GroundTruthLine,
    LineComparison, MatchStatus, ReconciliationSummary, Rule, TrustedLedgerEntry, ValidationCheck,
    ValidationReport,
};
pub use reconcile::{reconcile, InvoiceTotals, ReconLine, ReconSource};
pub use validate::validate;
