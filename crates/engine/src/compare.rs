use std::collections::BTreeMap;

use crate::config::Thresholds;
use crate::model::{
    parse_work_date, AccuracyReport, ExtractedLine, GroundTruthLine, LineComparison, MatchStatus,
};

/// Join key for one side of the comparison: normalized work date + project.
///
/// Extracted dates that parse are re-rendered `YYYY-MM-DD` so they compare
/// equal to ground-truth dates; unparseable ones keep their raw trimmed text,
/// which can never equal a ground-truth key and therefore classifies
/// EXTRA_EXTRACTED.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CompareKey {
    work_date: String,
    project: String,
}

/// Compare extraction output against analyst ground truth for one document.
///
/// Both sides are aggregated by `(work_date, project)` before comparison,
/// since timesheets and ground truth may both split a project's hours across
/// several entries on the same day. Every key present on either side lands in
/// exactly one `LineComparison`.
pub fn compare(
    doc_id: &str,
    extracted: &[ExtractedLine],
    ground_truth: &[GroundTruthLine],
    thresholds: &Thresholds,
) -> AccuracyReport {
    let gt_sums = aggregate_ground_truth(ground_truth);
    let ext_sums = aggregate_extracted(extracted);

    let mut comparisons = Vec::new();
    let mut matched = 0;
    let mut discrepancies = 0;
    let mut missing_extracted = 0;
    let mut extra_extracted = 0;

    for (key, gt_hours) in &gt_sums {
        match ext_sums.get(key) {
            Some(ext_hours) => {
                let delta = (gt_hours - ext_hours).abs();
                let status = if delta < thresholds.hours_epsilon {
                    matched += 1;
                    MatchStatus::Match
                } else {
                    discrepancies += 1;
                    MatchStatus::Discrepancy
                };
                comparisons.push(LineComparison {
                    work_date: key.work_date.clone(),
                    project: key.project.clone(),
                    gt_hours: Some(*gt_hours),
                    ext_hours: Some(*ext_hours),
                    hours_delta: delta,
                    status,
                    details: match status {
                        MatchStatus::Match => "hours agree".to_string(),
                        _ => format!("ground truth {gt_hours}h vs extracted {ext_hours}h"),
                    },
                });
            }
            None => {
                missing_extracted += 1;
                comparisons.push(LineComparison {
                    work_date: key.work_date.clone(),
                    project: key.project.clone(),
                    gt_hours: Some(*gt_hours),
                    ext_hours: None,
                    hours_delta: *gt_hours,
                    status: MatchStatus::MissingExtracted,
                    details: "ground truth entry with no extracted counterpart".to_string(),
                });
            }
        }
    }

    for (key, ext_hours) in &ext_sums {
        if !gt_sums.contains_key(key) {
            extra_extracted += 1;
            comparisons.push(LineComparison {
                work_date: key.work_date.clone(),
                project: key.project.clone(),
                gt_hours: None,
                ext_hours: Some(*ext_hours),
                hours_delta: *ext_hours,
                status: MatchStatus::ExtraExtracted,
                details: "extracted entry with no ground-truth counterpart".to_string(),
            });
        }
    }

    let total_gt_hours: f64 = ground_truth.iter().map(|l| l.hours).sum();
    let total_ext_hours: f64 = extracted.iter().filter_map(|l| l.hours).sum();

    AccuracyReport {
        doc_id: doc_id.to_string(),
        total_gt_lines: ground_truth.len(),
        total_ext_lines: extracted.len(),
        matched,
        discrepancies,
        missing_extracted,
        extra_extracted,
        total_gt_hours,
        total_ext_hours,
        hours_accuracy_pct: hours_accuracy_pct(total_gt_hours, total_ext_hours),
        comparisons,
    }
}

/// Aggregate accuracy of total hours, guarded against a zero ground-truth
/// denominator: 100 when both sides are zero, 0 when ground truth is zero but
/// extraction found hours anyway.
pub fn hours_accuracy_pct(total_gt_hours: f64, total_ext_hours: f64) -> f64 {
    if total_gt_hours > 0.0 {
        (1.0 - (total_ext_hours - total_gt_hours).abs() / total_gt_hours) * 100.0
    } else if total_ext_hours == 0.0 {
        100.0
    } else {
        0.0
    }
}

fn aggregate_ground_truth(lines: &[GroundTruthLine]) -> BTreeMap<CompareKey, f64> {
    let mut sums = BTreeMap::new();
    for line in lines {
        let key = CompareKey {
            work_date: line.work_date.to_string(),
            project: line.project.trim().to_string(),
        };
        *sums.entry(key).or_insert(0.0) += line.hours;
    }
    sums
}

fn aggregate_extracted(lines: &[ExtractedLine]) -> BTreeMap<CompareKey, f64> {
    let mut sums = BTreeMap::new();
    for line in lines {
        let work_date = match parse_work_date(&line.work_date) {
            Some(d) => d.to_string(),
            None => line.work_date.trim().to_string(),
        };
        let key = CompareKey {
            work_date,
            project: line.project.trim().to_string(),
        };
        // Missing hours aggregate as zero so the key still surfaces
        *sums.entry(key).or_insert(0.0) += line.hours.unwrap_or(0.0);
    }
    sums
}
