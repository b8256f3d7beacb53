use std::collections::BTreeSet;

use crate::config::Thresholds;
use crate::model::{
    CheckStatus, ExtractedLine, Rule, ValidationCheck, ValidationReport,
};

/// Evaluate every document-level and line-level rule over the supplied lines.
///
/// Pure function of its input: malformed line content is the thing being
/// reported, so nothing here returns an error. An empty line set still
/// produces the full document-level check list (all failing, which is the
/// point).
pub fn validate(doc_id: &str, lines: &[ExtractedLine], thresholds: &Thresholds) -> ValidationReport {
    let mut checks = document_checks(lines, thresholds);

    let checked = match thresholds.line_check_cap {
        Some(cap) if lines.len() > cap => {
            checks.push(ValidationCheck {
                rule: Rule::SamplingPolicy,
                status: CheckStatus::Warn,
                details: format!(
                    "line checks capped at {cap} of {} lines by configured policy",
                    lines.len()
                ),
                computed_value: Some(cap.to_string()),
                line_id: None,
            });
            &lines[..cap]
        }
        _ => lines,
    };

    let mut valid_line_count = 0;
    let mut invalid_line_count = 0;
    for line in checked {
        let line_checks = line_checks(line, thresholds);
        if line_checks.iter().all(|c| c.status == CheckStatus::Pass) {
            valid_line_count += 1;
        } else {
            invalid_line_count += 1;
        }
        checks.extend(line_checks);
    }

    let overall_status = if checks.iter().any(|c| c.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else if checks.iter().any(|c| c.status == CheckStatus::Warn) {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };
    let warnings_count = checks.iter().filter(|c| c.status == CheckStatus::Warn).count();

    ValidationReport {
        doc_id: doc_id.to_string(),
        overall_status,
        checks,
        valid_line_count,
        invalid_line_count,
        warnings_count,
    }
}

// ---------------------------------------------------------------------------
// Document-level rules
// ---------------------------------------------------------------------------

fn document_checks(lines: &[ExtractedLine], thresholds: &Thresholds) -> Vec<ValidationCheck> {
    let mut checks = Vec::new();

    // WORKER_IDENTIFIABLE: any non-empty worker value
    let workers: BTreeSet<&str> = lines
        .iter()
        .map(|l| l.worker.trim())
        .filter(|w| !w.is_empty())
        .collect();
    checks.push(ValidationCheck {
        rule: Rule::WorkerIdentifiable,
        status: if workers.is_empty() { CheckStatus::Fail } else { CheckStatus::Pass },
        details: if workers.is_empty() {
            "no worker identified".to_string()
        } else {
            let names: Vec<&str> = workers.iter().copied().collect();
            format!("found {} unique worker(s): {}", workers.len(), names.join(", "))
        },
        computed_value: Some(workers.len().to_string()),
        line_id: None,
    });

    // DATES_PRESENT: any non-empty work_date
    let date_count = lines.iter().filter(|l| !l.work_date.trim().is_empty()).count();
    checks.push(ValidationCheck {
        rule: Rule::DatesPresent,
        status: if date_count > 0 { CheckStatus::Pass } else { CheckStatus::Fail },
        details: if date_count > 0 {
            format!("found {date_count} date entries")
        } else {
            "no dates found".to_string()
        },
        computed_value: Some(date_count.to_string()),
        line_id: None,
    });

    // TOTAL_HOURS_REASONABLE: 0 < total <= weekly limit; above warns, zero
    // or negative fails
    let total_hours: f64 = lines.iter().filter_map(|l| l.hours).sum();
    let (status, note) = if total_hours == 0.0 {
        (CheckStatus::Fail, "no hours extracted")
    } else if total_hours < 0.0 {
        (CheckStatus::Fail, "total is negative")
    } else if total_hours > thresholds.max_weekly_hours {
        (CheckStatus::Warn, "exceeds weekly limit - verify overtime")
    } else {
        (CheckStatus::Pass, "within normal range")
    };
    checks.push(ValidationCheck {
        rule: Rule::TotalHoursReasonable,
        status,
        details: format!("total hours: {total_hours}. {note}"),
        computed_value: Some(total_hours.to_string()),
        line_id: None,
    });

    // EXTRACTION_CONFIDENCE: mean below floor warns, never fails
    let mean_confidence = if lines.is_empty() {
        0.0
    } else {
        lines.iter().map(|l| l.extraction_confidence).sum::<f64>() / lines.len() as f64
    };
    checks.push(ValidationCheck {
        rule: Rule::ExtractionConfidence,
        status: if mean_confidence >= thresholds.min_mean_confidence {
            CheckStatus::Pass
        } else {
            CheckStatus::Warn
        },
        details: format!("average confidence: {mean_confidence:.2}"),
        computed_value: Some(format!("{mean_confidence:.2}")),
        line_id: None,
    });

    checks
}

// ---------------------------------------------------------------------------
// Line-level rules
// ---------------------------------------------------------------------------

fn line_checks(line: &ExtractedLine, thresholds: &Thresholds) -> Vec<ValidationCheck> {
    let mut checks = Vec::new();
    let line_id = Some(line.line_id.clone());

    // VALID_DATE_FORMAT
    let parsed = line.parsed_date();
    checks.push(ValidationCheck {
        rule: Rule::ValidDateFormat,
        status: if parsed.is_some() { CheckStatus::Pass } else { CheckStatus::Fail },
        details: format!(
            "date '{}' is {}",
            line.work_date,
            if parsed.is_some() { "valid" } else { "invalid or missing" }
        ),
        computed_value: parsed.map(|d| d.to_string()),
        line_id: line_id.clone(),
    });

    // HOURS_IN_RANGE: missing or negative fails, above daily limit warns
    let (status, details) = match line.hours {
        None => (CheckStatus::Fail, "hours missing or non-numeric".to_string()),
        Some(h) if h < 0.0 => (CheckStatus::Fail, format!("hours {h} is negative")),
        Some(h) if h > thresholds.max_daily_hours => (
            CheckStatus::Warn,
            format!("hours {h} exceeds daily limit {}", thresholds.max_daily_hours),
        ),
        Some(h) => (CheckStatus::Pass, format!("hours {h} within range")),
    };
    checks.push(ValidationCheck {
        rule: Rule::HoursInRange,
        status,
        details,
        computed_value: line.hours.map(|h| h.to_string()),
        line_id: line_id.clone(),
    });

    // REQUIRED_FIELDS_PRESENT: worker, work_date, hours
    let mut missing = Vec::new();
    if line.worker.trim().is_empty() {
        missing.push("worker");
    }
    if line.work_date.trim().is_empty() {
        missing.push("work_date");
    }
    if line.hours.is_none() {
        missing.push("hours");
    }
    checks.push(ValidationCheck {
        rule: Rule::RequiredFieldsPresent,
        status: if missing.is_empty() { CheckStatus::Pass } else { CheckStatus::Fail },
        details: if missing.is_empty() {
            "all required fields present".to_string()
        } else {
            format!("missing fields: {}", missing.join(", "))
        },
        computed_value: None,
        line_id,
    });

    checks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, worker: &str, date: &str, hours: Option<f64>, confidence: f64) -> ExtractedLine {
        ExtractedLine {
            line_id: id.into(),
            doc_id: "doc_1".into(),
            worker: worker.into(),
            work_date: date.into(),
            project: "PROJ-A".into(),
            hours,
            extraction_confidence: confidence,
            raw_text: String::new(),
        }
    }

    fn status_of(report: &ValidationReport, rule: Rule) -> CheckStatus {
        report
            .checks
            .iter()
            .find(|c| c.rule == rule && c.line_id.is_none())
            .map(|c| c.status)
            .unwrap()
    }

    fn line_status_of(report: &ValidationReport, rule: Rule, line_id: &str) -> CheckStatus {
        report
            .checks
            .iter()
            .find(|c| c.rule == rule && c.line_id.as_deref() == Some(line_id))
            .map(|c| c.status)
            .unwrap()
    }

    #[test]
    fn clean_document_passes() {
        let lines = vec![
            line("l1", "Mike Agrawal", "2026-01-12", Some(8.0), 0.95),
            line("l2", "Mike Agrawal", "2026-01-13", Some(7.5), 0.9),
        ];
        let report = validate("doc_1", &lines, &Thresholds::default());
        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert_eq!(report.valid_line_count, 2);
        assert_eq!(report.invalid_line_count, 0);
        assert_eq!(report.warnings_count, 0);
    }

    #[test]
    fn empty_document_fails_every_document_rule_except_confidence() {
        let report = validate("doc_1", &[], &Thresholds::default());
        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(status_of(&report, Rule::WorkerIdentifiable), CheckStatus::Fail);
        assert_eq!(status_of(&report, Rule::DatesPresent), CheckStatus::Fail);
        assert_eq!(status_of(&report, Rule::TotalHoursReasonable), CheckStatus::Fail);
        // Confidence is advisory only, so even a degenerate mean is a WARN
        assert_eq!(status_of(&report, Rule::ExtractionConfidence), CheckStatus::Warn);
    }

    #[test]
    fn total_hours_zero_fails_in_range_passes_over_limit_warns() {
        let thresholds = Thresholds::default();

        let zero = vec![line("l1", "W", "2026-01-12", Some(0.0), 0.9)];
        let report = validate("d", &zero, &thresholds);
        assert_eq!(status_of(&report, Rule::TotalHoursReasonable), CheckStatus::Fail);

        let negative = vec![
            line("l1", "W", "2026-01-12", Some(-8.0), 0.9),
            line("l2", "W", "2026-01-13", Some(4.0), 0.9),
        ];
        let report = validate("d", &negative, &thresholds);
        assert_eq!(status_of(&report, Rule::TotalHoursReasonable), CheckStatus::Fail);

        let ok = vec![line("l1", "W", "2026-01-12", Some(40.0), 0.9)];
        let report = validate("d", &ok, &thresholds);
        assert_eq!(status_of(&report, Rule::TotalHoursReasonable), CheckStatus::Pass);

        let sixty = vec![line("l1", "W", "2026-01-12", Some(60.0), 0.9)];
        let report = validate("d", &sixty, &thresholds);
        assert_eq!(status_of(&report, Rule::TotalHoursReasonable), CheckStatus::Pass);

        let over = vec![
            line("l1", "W", "2026-01-12", Some(40.0), 0.9),
            line("l2", "W", "2026-01-13", Some(25.0), 0.9),
        ];
        let report = validate("d", &over, &thresholds);
        assert_eq!(status_of(&report, Rule::TotalHoursReasonable), CheckStatus::Warn);
    }

    #[test]
    fn low_confidence_warns_never_fails() {
        let lines = vec![line("l1", "W", "2026-01-12", Some(8.0), 0.4)];
        let report = validate("d", &lines, &Thresholds::default());
        assert_eq!(status_of(&report, Rule::ExtractionConfidence), CheckStatus::Warn);
        assert_eq!(report.overall_status, CheckStatus::Warn);
    }

    #[test]
    fn hours_in_range_statuses() {
        let thresholds = Thresholds::default();

        let missing = vec![line("l1", "W", "2026-01-12", None, 0.9)];
        let report = validate("d", &missing, &thresholds);
        assert_eq!(line_status_of(&report, Rule::HoursInRange, "l1"), CheckStatus::Fail);

        let negative = vec![line("l1", "W", "2026-01-12", Some(-2.0), 0.9)];
        let report = validate("d", &negative, &thresholds);
        assert_eq!(line_status_of(&report, Rule::HoursInRange, "l1"), CheckStatus::Fail);

        let over = vec![line("l1", "W", "2026-01-12", Some(25.0), 0.9)];
        let report = validate("d", &over, &thresholds);
        assert_eq!(line_status_of(&report, Rule::HoursInRange, "l1"), CheckStatus::Warn);

        let edge = vec![line("l1", "W", "2026-01-12", Some(24.0), 0.9)];
        let report = validate("d", &edge, &thresholds);
        assert_eq!(line_status_of(&report, Rule::HoursInRange, "l1"), CheckStatus::Pass);
    }

    #[test]
    fn bad_date_fails_line_and_partitions_counts() {
        let lines = vec![
            line("l1", "W", "2026-01-12", Some(8.0), 0.9),
            line("l2", "W", "01/13/2026", Some(8.0), 0.9),
        ];
        let report = validate("d", &lines, &Thresholds::default());
        assert_eq!(line_status_of(&report, Rule::ValidDateFormat, "l2"), CheckStatus::Fail);
        assert_eq!(report.valid_line_count, 1);
        assert_eq!(report.invalid_line_count, 1);
        assert_eq!(report.overall_status, CheckStatus::Fail);
    }

    #[test]
    fn required_fields_reports_whats_missing() {
        let lines = vec![line("l1", "", "", None, 0.9)];
        let report = validate("d", &lines, &Thresholds::default());
        let check = report
            .checks
            .iter()
            .find(|c| c.rule == Rule::RequiredFieldsPresent)
            .unwrap();
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.contains("worker"));
        assert!(check.details.contains("work_date"));
        assert!(check.details.contains("hours"));
    }

    #[test]
    fn line_check_cap_is_announced_not_silent() {
        let thresholds = Thresholds {
            line_check_cap: Some(2),
            ..Thresholds::default()
        };
        let lines: Vec<ExtractedLine> = (0..5)
            .map(|i| line(&format!("l{i}"), "W", "2026-01-12", Some(8.0), 0.9))
            .collect();
        let report = validate("d", &lines, &thresholds);
        let sampling = report
            .checks
            .iter()
            .find(|c| c.rule == Rule::SamplingPolicy)
            .unwrap();
        assert_eq!(sampling.status, CheckStatus::Warn);
        assert!(sampling.details.contains("capped at 2"));
        // Only the first two lines got line checks
        let line_checks = report.checks.iter().filter(|c| c.line_id.is_some()).count();
        assert_eq!(line_checks, 6);
        assert_eq!(report.valid_line_count + report.invalid_line_count, 2);
    }

    #[test]
    fn malformed_everything_still_returns_a_report() {
        let lines = vec![line("l1", "  ", "garbage", None, -3.0)];
        let report = validate("d", &lines, &Thresholds::default());
        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert!(report.checks.len() >= 7);
    }
}
