use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input lines
// ---------------------------------------------------------------------------

/// A single line produced by the extraction step.
///
/// Extraction output is untrusted: `work_date` is kept as the raw string the
/// extractor emitted and `hours` is `None` when the source cell was missing or
/// non-numeric. Validation reports on malformed values instead of this type
/// rejecting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedLine {
    pub line_id: String,
    pub doc_id: String,
    pub worker: String,
    pub work_date: String,
    pub project: String,
    pub hours: Option<f64>,
    pub extraction_confidence: f64,
    #[serde(default)]
    pub raw_text: String,
}

impl ExtractedLine {
    /// The work date as a calendar date, if it parses strictly.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_work_date(&self.work_date)
    }
}

/// Parse a work date the way the extraction pathway writes them: `YYYY-MM-DD`,
/// tolerating stray quotes and surrounding whitespace only.
pub fn parse_work_date(raw: &str) -> Option<NaiveDate> {
    let clean = raw.trim().trim_matches('"').trim();
    NaiveDate::parse_from_str(clean, "%Y-%m-%d").ok()
}

/// An analyst-entered correct line. Keyed by `(doc_id, work_date, project)`;
/// strictly typed because a human entered it through a validating surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthLine {
    pub doc_id: String,
    pub worker: String,
    pub work_date: NaiveDate,
    pub project: String,
    pub hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Warn => write!(f, "WARN"),
        }
    }
}

impl CheckStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PASS" => Some(Self::Pass),
            "FAIL" => Some(Self::Fail),
            "WARN" => Some(Self::Warn),
            _ => None,
        }
    }
}

/// Validation rule identifiers. Document-scoped rules run once per document;
/// line-scoped rules run per line and carry a `line_id` on their checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    // Document-scoped
    WorkerIdentifiable,
    DatesPresent,
    TotalHoursReasonable,
    ExtractionConfidence,
    SamplingPolicy,
    // Line-scoped
    ValidDateFormat,
    HoursInRange,
    RequiredFieldsPresent,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WorkerIdentifiable => "WORKER_IDENTIFIABLE",
            Self::DatesPresent => "DATES_PRESENT",
            Self::TotalHoursReasonable => "TOTAL_HOURS_REASONABLE",
            Self::ExtractionConfidence => "EXTRACTION_CONFIDENCE",
            Self::SamplingPolicy => "SAMPLING_POLICY",
            Self::ValidDateFormat => "VALID_DATE_FORMAT",
            Self::HoursInRange => "HOURS_IN_RANGE",
            Self::RequiredFieldsPresent => "REQUIRED_FIELDS_PRESENT",
        };
        write!(f, "{name}")
    }
}

impl Rule {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WORKER_IDENTIFIABLE" => Some(Self::WorkerIdentifiable),
            "DATES_PRESENT" => Some(Self::DatesPresent),
            "TOTAL_HOURS_REASONABLE" => Some(Self::TotalHoursReasonable),
            "EXTRACTION_CONFIDENCE" => Some(Self::ExtractionConfidence),
            "SAMPLING_POLICY" => Some(Self::SamplingPolicy),
            "VALID_DATE_FORMAT" => Some(Self::ValidDateFormat),
            "HOURS_IN_RANGE" => Some(Self::HoursInRange),
            "REQUIRED_FIELDS_PRESENT" => Some(Self::RequiredFieldsPresent),
            _ => None,
        }
    }
}

/// One evaluated rule. Line-scoped checks carry `line_id`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationCheck {
    pub rule: Rule,
    pub status: CheckStatus,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_id: Option<String>,
}

/// Full validation run output for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub doc_id: String,
    pub overall_status: CheckStatus,
    pub checks: Vec<ValidationCheck>,
    pub valid_line_count: usize,
    pub invalid_line_count: usize,
    pub warnings_count: usize,
}

// ---------------------------------------------------------------------------
// Accuracy matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Match,
    Discrepancy,
    MissingExtracted,
    ExtraExtracted,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "MATCH"),
            Self::Discrepancy => write!(f, "DISCREPANCY"),
            Self::MissingExtracted => write!(f, "MISSING_EXTRACTED"),
            Self::ExtraExtracted => write!(f, "EXTRA_EXTRACTED"),
        }
    }
}

/// Per-key comparison between summed ground-truth hours and summed extracted
/// hours. Derived on read, never authoritative state.
#[derive(Debug, Clone, Serialize)]
pub struct LineComparison {
    pub work_date: String,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext_hours: Option<f64>,
    pub hours_delta: f64,
    pub status: MatchStatus,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccuracyReport {
    pub doc_id: String,
    pub total_gt_lines: usize,
    pub total_ext_lines: usize,
    pub matched: usize,
    pub discrepancies: usize,
    pub missing_extracted: usize,
    pub extra_extracted: usize,
    pub total_gt_hours: f64,
    pub total_ext_hours: f64,
    pub hours_accuracy_pct: f64,
    pub comparisons: Vec<LineComparison>,
}

// ---------------------------------------------------------------------------
// Approval ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
    Corrected,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Corrected => write!(f, "CORRECTED"),
        }
    }
}

impl Decision {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "CORRECTED" => Some(Self::Corrected),
            _ => None,
        }
    }
}

/// A reviewer's decision for one extracted line. At most one per `line_id`;
/// re-deciding overwrites (last write wins, no decision history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub line_id: String,
    pub doc_id: String,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// One row of the trusted ledger read-model: an approved or corrected line
/// with overrides applied. `work_date` is `None` when the original date never
/// parsed and no corrected date was supplied.
#[derive(Debug, Clone, Serialize)]
pub struct TrustedLedgerEntry {
    pub line_id: String,
    pub doc_id: String,
    pub worker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_date: Option<NaiveDate>,
    pub project: String,
    pub hours: f64,
    pub decision: Decision,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// One reconciliation run for one period. Appended to history, never upserted.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationSummary {
    pub period_month: String,
    pub period_quarter: String,
    pub approved_hours: f64,
    pub hourly_rate: f64,
    pub implied_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_subsub_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_prime_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_subsub: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_subsub_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_prime: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_prime_pct: Option<f64>,
    pub variance_tolerance_pct: f64,
    pub within_tolerance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<String>,
    pub data_source: crate::reconcile::ReconSource,
}
