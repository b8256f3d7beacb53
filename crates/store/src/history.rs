use chrono::{DateTime, Utc};
use rusqlite::params;
use tallysheet_engine::{ReconSource, ReconciliationSummary};

use crate::{Store, StoreError};

/// One persisted reconciliation run. History is append-only: every run adds a
/// row, even for a period already reconciled, so past results stay auditable.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReconRun {
    pub id: i64,
    pub run_at: DateTime<Utc>,
    pub summary: ReconciliationSummary,
}

impl Store {
    /// Append one reconciliation summary to history. Never updates or
    /// deletes earlier rows.
    pub fn append_recon_summary(
        &mut self,
        summary: &ReconciliationSummary,
        run_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO recon_summary
             (run_at, period_month, period_quarter, approved_hours, hourly_rate, implied_cost,
              invoice_subsub_amount, invoice_prime_amount,
              variance_subsub, variance_subsub_pct, variance_prime, variance_prime_pct,
              variance_tolerance_pct, within_tolerance, exception_details, data_source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                run_at,
                summary.period_month,
                summary.period_quarter,
                summary.approved_hours,
                summary.hourly_rate,
                summary.implied_cost,
                summary.invoice_subsub_amount,
                summary.invoice_prime_amount,
                summary.variance_subsub,
                summary.variance_subsub_pct,
                summary.variance_prime,
                summary.variance_prime_pct,
                summary.variance_tolerance_pct,
                summary.within_tolerance,
                summary.exception_details,
                summary.data_source.to_string(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(
            period = %summary.period_month,
            within_tolerance = summary.within_tolerance,
            "recorded reconciliation run"
        );
        Ok(id)
    }

    /// All reconciliation runs, oldest first.
    pub fn recon_history(&self) -> Result<Vec<ReconRun>, StoreError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, run_at, period_month, period_quarter, approved_hours, hourly_rate,
                    implied_cost, invoice_subsub_amount, invoice_prime_amount,
                    variance_subsub, variance_subsub_pct, variance_prime, variance_prime_pct,
                    variance_tolerance_pct, within_tolerance, exception_details, data_source
             FROM recon_summary ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, DateTime<Utc>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, Option<f64>>(7)?,
                    row.get::<_, Option<f64>>(8)?,
                    row.get::<_, Option<f64>>(9)?,
                    row.get::<_, Option<f64>>(10)?,
                    row.get::<_, Option<f64>>(11)?,
                    row.get::<_, Option<f64>>(12)?,
                    row.get::<_, f64>(13)?,
                    row.get::<_, bool>(14)?,
                    row.get::<_, Option<String>>(15)?,
                    row.get::<_, String>(16)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut runs = Vec::with_capacity(rows.len());
        for (
            id,
            run_at,
            period_month,
            period_quarter,
            approved_hours,
            hourly_rate,
            implied_cost,
            invoice_subsub_amount,
            invoice_prime_amount,
            variance_subsub,
            variance_subsub_pct,
            variance_prime,
            variance_prime_pct,
            variance_tolerance_pct,
            within_tolerance,
            exception_details,
            data_source,
        ) in rows
        {
            let data_source = ReconSource::parse(&data_source).ok_or_else(|| {
                StoreError::corrupt("recon_summary", format!("unknown source '{data_source}'"))
            })?;
            runs.push(ReconRun {
                id,
                run_at,
                summary: ReconciliationSummary {
                    period_month,
                    period_quarter,
                    approved_hours,
                    hourly_rate,
                    implied_cost,
                    invoice_subsub_amount,
                    invoice_prime_amount,
                    variance_subsub,
                    variance_subsub_pct,
                    variance_prime,
                    variance_prime_pct,
                    variance_tolerance_pct,
                    within_tolerance,
                    exception_details,
                    data_source,
                },
            });
        }
        Ok(runs)
    }
}
