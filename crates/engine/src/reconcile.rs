use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{ReconciliationSummary, TrustedLedgerEntry};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One dated, trusted line feeding reconciliation. Undated ledger entries
/// cannot belong to a period; `TrustedLedgerEntry::recon_line` returns `None`
/// for them and the caller decides how loudly to complain.
#[derive(Debug, Clone, Serialize)]
pub struct ReconLine {
    pub worker: String,
    pub work_date: NaiveDate,
    pub project: String,
    pub hours: f64,
}

impl TrustedLedgerEntry {
    pub fn recon_line(&self) -> Option<ReconLine> {
        Some(ReconLine {
            worker: self.worker.clone(),
            work_date: self.work_date?,
            project: self.project.clone(),
            hours: self.hours,
        })
    }
}

/// Which line set fed a reconciliation run. The caller chooses — falling back
/// from the trusted ledger to raw extraction is an explicit policy decision,
/// not something this engine infers from an empty table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconSource {
    #[default]
    Trusted,
    Raw,
}

impl std::fmt::Display for ReconSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trusted => write!(f, "trusted"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

impl ReconSource {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trusted" => Some(Self::Trusted),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Invoice totals for the billing period, each already extracted upstream.
/// Absent invoices are a first-class case: reconciliation without them is
/// trivially within tolerance.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceTotals {
    /// Sub-sub contractor's invoice to us.
    pub subsub: Option<f64>,
    /// Our invoice to the prime.
    pub prime: Option<f64>,
}

impl InvoiceTotals {
    pub fn is_empty(&self) -> bool {
        self.subsub.is_none() && self.prime.is_none()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Reconcile trusted hours against invoice totals, grouped per calendar
/// month. Returns one summary per month present in the input, in period
/// order.
///
/// Invoice totals cover one billing period, so the invoice comparison is only
/// attached when the input spans exactly one month; for multi-month input the
/// per-month rows carry hours and implied cost only (callers filter to a
/// single period to reconcile invoices).
pub fn reconcile(
    lines: &[ReconLine],
    invoices: &InvoiceTotals,
    hourly_rate: f64,
    tolerance_pct: f64,
    source: ReconSource,
) -> Vec<ReconciliationSummary> {
    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for line in lines {
        let key = (line.work_date.year(), line.work_date.month());
        *by_month.entry(key).or_insert(0.0) += line.hours;
    }
    if by_month.is_empty() {
        // No dated lines: still report the (empty) period so a run always
        // produces a row, mirroring a zero-hours month
        by_month.insert((0, 0), 0.0);
    }

    let single_period = by_month.len() == 1;
    by_month
        .into_iter()
        .map(|((year, month), approved_hours)| {
            let period_invoices = if single_period {
                *invoices
            } else {
                InvoiceTotals::default()
            };
            summarize_period(
                year,
                month,
                approved_hours,
                &period_invoices,
                hourly_rate,
                tolerance_pct,
                source,
            )
        })
        .collect()
}

fn summarize_period(
    year: i32,
    month: u32,
    approved_hours: f64,
    invoices: &InvoiceTotals,
    hourly_rate: f64,
    tolerance_pct: f64,
    source: ReconSource,
) -> ReconciliationSummary {
    let implied_cost = approved_hours * hourly_rate;

    let subsub = invoices.subsub.map(|amount| variance(amount, implied_cost));
    let prime = invoices.prime.map(|amount| variance(amount, implied_cost));

    let mut exceptions = Vec::new();
    if let Some(v) = &subsub {
        if let Some(msg) = v.breach("sub-sub invoice", tolerance_pct) {
            exceptions.push(msg);
        }
    }
    if let Some(v) = &prime {
        if let Some(msg) = v.breach("prime invoice", tolerance_pct) {
            exceptions.push(msg);
        }
    }
    let within_tolerance = exceptions.is_empty();

    ReconciliationSummary {
        period_month: if month == 0 {
            "unknown".to_string()
        } else {
            format!("{year:04}-{month:02}")
        },
        period_quarter: if month == 0 {
            "unknown".to_string()
        } else {
            format!("{year:04}-Q{}", (month - 1) / 3 + 1)
        },
        approved_hours,
        hourly_rate,
        implied_cost,
        invoice_subsub_amount: invoices.subsub,
        invoice_prime_amount: invoices.prime,
        variance_subsub: subsub.as_ref().map(|v| v.amount),
        variance_subsub_pct: subsub.as_ref().and_then(|v| v.pct),
        variance_prime: prime.as_ref().map(|v| v.amount),
        variance_prime_pct: prime.as_ref().and_then(|v| v.pct),
        variance_tolerance_pct: tolerance_pct,
        within_tolerance,
        exception_details: if exceptions.is_empty() {
            None
        } else {
            Some(exceptions.join("; "))
        },
        data_source: source,
    }
}

struct Variance {
    amount: f64,
    /// `None` when implied cost is zero but the invoice is not — the
    /// percentage is undefined and only the absolute variance is reportable.
    pct: Option<f64>,
}

fn variance(invoice_amount: f64, implied_cost: f64) -> Variance {
    let amount = invoice_amount - implied_cost;
    let pct = if implied_cost != 0.0 {
        Some(amount / implied_cost * 100.0)
    } else if amount == 0.0 {
        Some(0.0)
    } else {
        None
    };
    Variance { amount, pct }
}

impl Variance {
    /// A breach message when this variance exceeds tolerance, else `None`.
    /// An undefined percentage with a nonzero variance is always a breach.
    fn breach(&self, invoice_name: &str, tolerance_pct: f64) -> Option<String> {
        match self.pct {
            Some(pct) if pct.abs() <= tolerance_pct => None,
            Some(pct) => Some(format!(
                "{invoice_name} variance {:+.2} ({pct:+.2}%) exceeds tolerance {tolerance_pct}%",
                self.amount
            )),
            None => Some(format!(
                "{invoice_name} variance {:+.2} against zero implied cost",
                self.amount
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recon_line(date: &str, hours: f64) -> ReconLine {
        ReconLine {
            worker: "Mike Agrawal".into(),
            work_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            project: "PROJ-A".into(),
            hours,
        }
    }

    fn week_of_forty() -> Vec<ReconLine> {
        (12..17)
            .map(|d| recon_line(&format!("2026-01-{d}"), 8.0))
            .collect()
    }

    #[test]
    fn implied_cost_and_variance() {
        let invoices = InvoiceTotals {
            subsub: Some(6060.0),
            prime: None,
        };
        let out = reconcile(&week_of_forty(), &invoices, 150.0, 1.0, ReconSource::Trusted);
        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.period_month, "2026-01");
        assert_eq!(s.period_quarter, "2026-Q1");
        assert_eq!(s.approved_hours, 40.0);
        assert_eq!(s.implied_cost, 6000.0);
        assert_eq!(s.variance_subsub, Some(60.0));
        assert_eq!(s.variance_subsub_pct, Some(1.0));
        assert!(s.within_tolerance);
        assert!(s.exception_details.is_none());
    }

    #[test]
    fn tighter_tolerance_flags_the_breaching_invoice() {
        let invoices = InvoiceTotals {
            subsub: Some(6060.0),
            prime: None,
        };
        let out = reconcile(&week_of_forty(), &invoices, 150.0, 0.5, ReconSource::Trusted);
        let s = &out[0];
        assert!(!s.within_tolerance);
        let details = s.exception_details.as_ref().unwrap();
        assert!(details.contains("sub-sub invoice"));
        assert!(details.contains("+60.00"));
    }

    #[test]
    fn both_invoices_reported_independently() {
        let invoices = InvoiceTotals {
            subsub: Some(6000.0),
            prime: Some(6600.0),
        };
        let out = reconcile(&week_of_forty(), &invoices, 150.0, 1.0, ReconSource::Trusted);
        let s = &out[0];
        assert_eq!(s.variance_subsub, Some(0.0));
        assert_eq!(s.variance_prime, Some(600.0));
        assert_eq!(s.variance_prime_pct, Some(10.0));
        assert!(!s.within_tolerance);
        let details = s.exception_details.as_ref().unwrap();
        assert!(details.contains("prime invoice"));
        assert!(!details.contains("sub-sub"));
    }

    #[test]
    fn no_invoices_is_trivially_within_tolerance() {
        let out = reconcile(
            &week_of_forty(),
            &InvoiceTotals::default(),
            150.0,
            1.0,
            ReconSource::Trusted,
        );
        assert!(out[0].within_tolerance);
        assert!(out[0].invoice_subsub_amount.is_none());
    }

    #[test]
    fn zero_cost_zero_invoice_is_zero_pct() {
        let invoices = InvoiceTotals {
            subsub: Some(0.0),
            prime: None,
        };
        let out = reconcile(&[], &invoices, 150.0, 1.0, ReconSource::Trusted);
        let s = &out[0];
        assert_eq!(s.implied_cost, 0.0);
        assert_eq!(s.variance_subsub_pct, Some(0.0));
        assert!(s.within_tolerance);
    }

    #[test]
    fn zero_cost_nonzero_invoice_has_null_pct_and_breaches() {
        let invoices = InvoiceTotals {
            subsub: Some(6000.0),
            prime: None,
        };
        let out = reconcile(&[], &invoices, 150.0, 1.0, ReconSource::Trusted);
        let s = &out[0];
        assert_eq!(s.variance_subsub, Some(6000.0));
        assert_eq!(s.variance_subsub_pct, None);
        assert!(!s.within_tolerance);
        assert!(s
            .exception_details
            .as_ref()
            .unwrap()
            .contains("zero implied cost"));
    }

    #[test]
    fn multi_month_input_groups_and_defers_invoices() {
        let mut lines = week_of_forty();
        lines.push(recon_line("2026-02-02", 8.0));
        let invoices = InvoiceTotals {
            subsub: Some(6060.0),
            prime: None,
        };
        let out = reconcile(&lines, &invoices, 150.0, 1.0, ReconSource::Trusted);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].period_month, "2026-01");
        assert_eq!(out[1].period_month, "2026-02");
        assert_eq!(out[1].approved_hours, 8.0);
        // Single invoice totals never prorated across months
        assert!(out[0].invoice_subsub_amount.is_none());
        assert!(out[1].invoice_subsub_amount.is_none());
        assert!(out[0].within_tolerance && out[1].within_tolerance);
    }

    #[test]
    fn quarter_derivation() {
        for (date, quarter) in [
            ("2026-01-15", "2026-Q1"),
            ("2026-04-01", "2026-Q2"),
            ("2026-09-30", "2026-Q3"),
            ("2026-12-31", "2026-Q4"),
        ] {
            let out = reconcile(
                &[recon_line(date, 8.0)],
                &InvoiceTotals::default(),
                150.0,
                1.0,
                ReconSource::Raw,
            );
            assert_eq!(out[0].period_quarter, quarter);
        }
    }

    #[test]
    fn source_is_recorded_on_the_summary() {
        let out = reconcile(
            &week_of_forty(),
            &InvoiceTotals::default(),
            150.0,
            1.0,
            ReconSource::Raw,
        );
        assert_eq!(out[0].data_source, ReconSource::Raw);
    }
}
