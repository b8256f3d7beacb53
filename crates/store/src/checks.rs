use rusqlite::params;
use tallysheet_engine::{CheckStatus, Rule, ValidationCheck};

use crate::{Store, StoreError};

impl Store {
    /// Replace all validation checks for a document (a validation run always
    /// supersedes the previous one wholesale).
    pub fn replace_validation_checks(
        &mut self,
        doc_id: &str,
        checks: &[ValidationCheck],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM validation_checks WHERE doc_id = ?1", [doc_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO validation_checks (doc_id, rule_name, status, details, computed_value, line_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for check in checks {
                stmt.execute(params![
                    doc_id,
                    check.rule.to_string(),
                    check.status.to_string(),
                    check.details,
                    check.computed_value,
                    check.line_id,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(doc_id, count = checks.len(), "replaced validation checks");
        Ok(())
    }

    pub fn validation_checks(&self, doc_id: &str) -> Result<Vec<ValidationCheck>, StoreError> {
        let mut stmt = self.conn().prepare(
            "SELECT rule_name, status, details, computed_value, line_id
             FROM validation_checks WHERE doc_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([doc_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut checks = Vec::with_capacity(rows.len());
        for (rule_name, status, details, computed_value, line_id) in rows {
            let rule = Rule::parse(&rule_name).ok_or_else(|| {
                StoreError::corrupt("validation_checks", format!("unknown rule '{rule_name}'"))
            })?;
            let status = CheckStatus::parse(&status).ok_or_else(|| {
                StoreError::corrupt("validation_checks", format!("unknown status '{status}'"))
            })?;
            checks.push(ValidationCheck {
                rule,
                status,
                details,
                computed_value,
                line_id,
            });
        }
        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(rule: Rule, status: CheckStatus, line_id: Option<&str>) -> ValidationCheck {
        ValidationCheck {
            rule,
            status,
            details: "details".into(),
            computed_value: None,
            line_id: line_id.map(Into::into),
        }
    }

    #[test]
    fn rerun_replaces_prior_checks() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_validation_checks(
                "doc_1",
                &[
                    check(Rule::WorkerIdentifiable, CheckStatus::Fail, None),
                    check(Rule::HoursInRange, CheckStatus::Fail, Some("l1")),
                ],
            )
            .unwrap();
        store
            .replace_validation_checks(
                "doc_1",
                &[check(Rule::WorkerIdentifiable, CheckStatus::Pass, None)],
            )
            .unwrap();
        let got = store.validation_checks("doc_1").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].status, CheckStatus::Pass);
        assert_eq!(got[0].line_id, None);
    }
}
