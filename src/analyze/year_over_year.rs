//! Year-over-year comparison: sub-period pivot and change rates.

use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::trend::stat_indices;
use crate::core::{BucketSeries, Granularity, YearOverYearReport, YearPivot};
use crate::error::{AnalysisError, Result};

/// Sub-period key within a year for the pivot rows.
fn sub_period_key(date: chrono::NaiveDate, granularity: Granularity) -> u32 {
    match granularity {
        Granularity::Day => date.ordinal(),
        Granularity::Week => date.iso_week().week(),
        Granularity::Month => date.month(),
        Granularity::Quarter => (date.month() - 1) / 3 + 1,
        Granularity::Year => 0,
    }
}

/// Run the year-over-year analysis.
///
/// At year granularity fewer than two distinct years is a hard
/// eligibility failure (`InsufficientData`); the engine surfaces it as a
/// structured not-eligible outcome. Finer granularities proceed with one
/// year but mark the report incomplete.
pub fn analyze_year_over_year(series: &BucketSeries) -> Result<YearOverYearReport> {
    if series.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let granularity = series.granularity;
    let indices = stat_indices(series);

    let years: BTreeSet<i32> = indices
        .iter()
        .map(|&i| series.buckets[i].start.year())
        .collect();

    if granularity == Granularity::Year && years.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            needed: 2,
            got: years.len(),
        });
    }
    if years.len() < 2 {
        warn!(
            years = years.len(),
            "year-over-year comparison with a single year; report will be incomplete"
        );
    }

    // Sum values per (year, sub-period).
    let mut grouped: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for &i in &indices {
        let bucket = &series.buckets[i];
        let key = (
            bucket.start.year(),
            sub_period_key(bucket.start, granularity),
        );
        *grouped.entry(key).or_insert(0.0) += bucket.value;
    }

    let mut yearly_totals: BTreeMap<i32, f64> = BTreeMap::new();
    for ((year, _), value) in &grouped {
        *yearly_totals.entry(*year).or_insert(0.0) += value;
    }

    let mut yoy_changes: BTreeMap<i32, f64> = BTreeMap::new();
    let pivot = if granularity == Granularity::Year {
        // Adjacent in-data years compare directly on totals.
        let year_list: Vec<i32> = years.iter().copied().collect();
        for pair in year_list.windows(2) {
            let prev = yearly_totals[&pair[0]];
            let curr = yearly_totals[&pair[1]];
            if prev != 0.0 {
                yoy_changes.insert(pair[1], (curr - prev) / prev * 100.0);
            }
        }
        None
    } else {
        let sub_periods: BTreeSet<u32> = grouped.keys().map(|(_, sub)| *sub).collect();
        let sub_periods: Vec<u32> = sub_periods.into_iter().collect();

        let mut values: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for &year in &years {
            let row: Vec<f64> = sub_periods
                .iter()
                .map(|&sub| grouped.get(&(year, sub)).copied().unwrap_or(0.0))
                .collect();
            values.insert(year, row);
        }

        let mut changes: BTreeMap<i32, Vec<Option<f64>>> = BTreeMap::new();
        for &year in &years {
            let Some(prev_row) = values.get(&(year - 1)) else {
                continue;
            };
            let curr_row = &values[&year];
            let row: Vec<Option<f64>> = curr_row
                .iter()
                .zip(prev_row.iter())
                .map(|(curr, prev)| {
                    if *prev != 0.0 {
                        Some((curr - prev) / prev * 100.0)
                    } else {
                        None
                    }
                })
                .collect();

            let defined: Vec<f64> = row.iter().flatten().copied().collect();
            if !defined.is_empty() {
                yoy_changes.insert(year, defined.iter().sum::<f64>() / defined.len() as f64);
            }
            changes.insert(year, row);
        }

        Some(YearPivot {
            sub_periods,
            values,
            changes,
        })
    };

    debug!(
        years = years.len(),
        changes = yoy_changes.len(),
        "year-over-year analysis complete"
    );

    Ok(YearOverYearReport {
        yearly_totals,
        yoy_changes,
        pivot,
        complete: years.len() >= 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Bucket;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_series(points: &[(i32, u32, f64)]) -> BucketSeries {
        // Contiguity is the aggregator's concern; these tests build the
        // grouped view directly from observed buckets.
        BucketSeries {
            granularity: Granularity::Month,
            buckets: points
                .iter()
                .map(|&(y, m, v)| Bucket {
                    start: date(y, m, 1),
                    value: v,
                    observed: true,
                })
                .collect(),
            value_column: "sales".to_string(),
            extras: vec![],
        }
    }

    #[test]
    fn december_change_matches_exact_formula() {
        let mut points: Vec<(i32, u32, f64)> = Vec::new();
        for m in 1..=12 {
            points.push((2022, m, 100.0));
        }
        for m in 1..=12 {
            points.push((2023, m, if m == 12 { 150.0 } else { 100.0 }));
        }
        let report = analyze_year_over_year(&monthly_series(&points)).unwrap();

        let pivot = report.pivot.unwrap();
        let december = pivot.sub_periods.iter().position(|&s| s == 12).unwrap();
        let change = pivot.changes[&2023][december].unwrap();
        assert_relative_eq!(change, (150.0 - 100.0) / 100.0 * 100.0, epsilon = 1e-9);
        assert!(report.complete);
    }

    #[test]
    fn yearly_totals_cover_each_year() {
        let report = analyze_year_over_year(&monthly_series(&[
            (2022, 1, 10.0),
            (2022, 2, 20.0),
            (2023, 1, 30.0),
        ]))
        .unwrap();
        assert_relative_eq!(report.yearly_totals[&2022], 30.0, epsilon = 1e-9);
        assert_relative_eq!(report.yearly_totals[&2023], 30.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_previous_sub_period_yields_undefined_change() {
        let report = analyze_year_over_year(&monthly_series(&[
            (2022, 1, 0.0),
            (2023, 1, 50.0),
        ]))
        .unwrap();
        let pivot = report.pivot.unwrap();
        assert_eq!(pivot.changes[&2023][0], None);
        assert!(report.yoy_changes.get(&2023).is_none());
    }

    #[test]
    fn single_year_is_incomplete_but_not_an_error() {
        let report =
            analyze_year_over_year(&monthly_series(&[(2023, 1, 10.0), (2023, 2, 12.0)])).unwrap();
        assert!(!report.complete);
        assert!(report.yoy_changes.is_empty());
    }

    #[test]
    fn year_granularity_requires_two_years() {
        let series = BucketSeries {
            granularity: Granularity::Year,
            buckets: vec![Bucket {
                start: date(2023, 1, 1),
                value: 100.0,
                observed: true,
            }],
            value_column: "sales".to_string(),
            extras: vec![],
        };
        assert!(matches!(
            analyze_year_over_year(&series),
            Err(AnalysisError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn year_granularity_compares_adjacent_years() {
        let series = BucketSeries {
            granularity: Granularity::Year,
            buckets: vec![
                Bucket { start: date(2022, 1, 1), value: 100.0, observed: true },
                Bucket { start: date(2023, 1, 1), value: 130.0, observed: true },
            ],
            value_column: "sales".to_string(),
            extras: vec![],
        };
        let report = analyze_year_over_year(&series).unwrap();
        assert_relative_eq!(report.yoy_changes[&2023], 30.0, epsilon = 1e-9);
        assert!(report.pivot.is_none());
    }
}
