//! Sequential period-over-period comparison at the chosen granularity.

use tracing::debug;

use crate::core::{BucketSeries, MomStats, MonthOverMonthReport, PeriodStep, StepExtreme};
use crate::error::{AnalysisError, Result};

/// Percent change with a defined zero policy: a missing or zero previous
/// value yields `None`, never an infinity.
fn safe_pct_change(current: f64, previous: Option<f64>) -> Option<f64> {
    match previous {
        Some(prev) if prev != 0.0 => Some((current - prev) / prev * 100.0),
        _ => None,
    }
}

/// Run the period-over-period analysis.
///
/// Steps run over observed buckets only: a zero-filled gap is not a real
/// period and comparing against it would fabricate a collapse and a
/// recovery around every hole in the data.
pub fn analyze_month_over_month(series: &BucketSeries) -> Result<MonthOverMonthReport> {
    if series.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let indices = {
        let observed = series.observed_indices();
        if observed.is_empty() {
            (0..series.len()).collect()
        } else {
            observed
        }
    };

    let mut steps: Vec<PeriodStep> = Vec::with_capacity(indices.len());
    let mut prev_value: Option<f64> = None;
    for &i in &indices {
        let bucket = &series.buckets[i];
        let change_pct = safe_pct_change(bucket.value, prev_value);
        steps.push(PeriodStep {
            label: series.label(i),
            start: bucket.start,
            value: bucket.value,
            prev_value,
            change_pct,
        });
        prev_value = Some(bucket.value);
    }

    let defined: Vec<(&PeriodStep, f64)> = steps
        .iter()
        .filter_map(|s| s.change_pct.map(|c| (s, c)))
        .collect();

    let positive_steps = defined.iter().filter(|(_, c)| *c > 0.0).count();
    let negative_steps = defined.iter().filter(|(_, c)| *c < 0.0).count();
    let flat_steps = defined.iter().filter(|(_, c)| *c == 0.0).count();

    let average_change_pct = if defined.is_empty() {
        None
    } else {
        Some(defined.iter().map(|(_, c)| c).sum::<f64>() / defined.len() as f64)
    };

    let max_increase = defined
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(step, change)| StepExtreme {
            change_pct: *change,
            label: step.label.clone(),
        });
    let max_decrease = defined
        .iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(step, change)| StepExtreme {
            change_pct: *change,
            label: step.label.clone(),
        });

    debug!(
        steps = steps.len(),
        defined_changes = defined.len(),
        "period-over-period analysis complete"
    );

    Ok(MonthOverMonthReport {
        steps,
        stats: MomStats {
            positive_steps,
            negative_steps,
            flat_steps,
            average_change_pct,
            max_increase,
            max_decrease,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bucket, Granularity};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn monthly(values: &[f64]) -> BucketSeries {
        BucketSeries {
            granularity: Granularity::Month,
            buckets: values
                .iter()
                .enumerate()
                .map(|(i, &v)| Bucket {
                    start: NaiveDate::from_ymd_opt(2024, i as u32 + 1, 1).unwrap(),
                    value: v,
                    observed: true,
                })
                .collect(),
            value_column: "sales".to_string(),
            extras: vec![],
        }
    }

    #[test]
    fn first_step_has_no_change() {
        let report = analyze_month_over_month(&monthly(&[100.0, 110.0])).unwrap();
        assert_eq!(report.steps[0].change_pct, None);
        assert_relative_eq!(report.steps[1].change_pct.unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_previous_period_yields_undefined_not_infinite() {
        let report = analyze_month_over_month(&monthly(&[0.0, 50.0, 75.0])).unwrap();
        assert_eq!(report.steps[1].change_pct, None);
        assert_relative_eq!(report.steps[2].change_pct.unwrap(), 50.0, epsilon = 1e-9);
        // Undefined steps are excluded from the aggregates.
        assert_eq!(report.stats.positive_steps, 1);
    }

    #[test]
    fn step_counts_split_by_sign() {
        let report =
            analyze_month_over_month(&monthly(&[100.0, 120.0, 90.0, 90.0, 130.0])).unwrap();
        assert_eq!(report.stats.positive_steps, 2);
        assert_eq!(report.stats.negative_steps, 1);
        assert_eq!(report.stats.flat_steps, 1);
    }

    #[test]
    fn extremes_carry_period_labels() {
        let report = analyze_month_over_month(&monthly(&[100.0, 200.0, 50.0])).unwrap();
        let inc = report.stats.max_increase.unwrap();
        assert_relative_eq!(inc.change_pct, 100.0, epsilon = 1e-9);
        assert_eq!(inc.label, "2024-02");
        let dec = report.stats.max_decrease.unwrap();
        assert_relative_eq!(dec.change_pct, -75.0, epsilon = 1e-9);
        assert_eq!(dec.label, "2024-03");
    }

    #[test]
    fn gap_fill_buckets_are_skipped() {
        let mut series = monthly(&[100.0, 0.0, 150.0]);
        series.buckets[1].observed = false;

        let report = analyze_month_over_month(&series).unwrap();
        assert_eq!(report.steps.len(), 2);
        // The change compares against the previous observed period.
        assert_relative_eq!(report.steps[1].change_pct.unwrap(), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn single_period_has_no_aggregates() {
        let report = analyze_month_over_month(&monthly(&[42.0])).unwrap();
        assert_eq!(report.stats.average_change_pct, None);
        assert!(report.stats.max_increase.is_none());
    }
}
