//! Trend analysis: overall statistics, growth rate and decomposition.

use tracing::debug;

use super::decompose::decompose;
use crate::core::{BucketSeries, Extreme, Granularity, SummaryStats, TrendReport};
use crate::error::{AnalysisError, Result};

/// Indices of the buckets that anchor summary statistics.
///
/// At day granularity only observed buckets count: a zero-filled missing
/// day would otherwise drag averages and minima down. At coarser
/// granularities every bucket participates, because a "partially
/// observed" week or month still holds real aggregated mass.
pub(crate) fn stat_indices(series: &BucketSeries) -> Vec<usize> {
    if series.granularity == Granularity::Day {
        let observed = series.observed_indices();
        if !observed.is_empty() {
            return observed;
        }
    }
    (0..series.len()).collect()
}

/// Run the trend analysis over an aggregated series.
pub fn analyze_trend(series: &BucketSeries) -> Result<TrendReport> {
    if series.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let indices = stat_indices(series);
    let values: Vec<f64> = indices.iter().map(|&i| series.buckets[i].value).collect();

    let total: f64 = values.iter().sum();
    let average = total / values.len() as f64;

    let (max_pos, _) = values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| {
            if v > acc.1 {
                (i, v)
            } else {
                acc
            }
        });
    let (min_pos, _) = values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |acc, (i, &v)| {
            if v < acc.1 {
                (i, v)
            } else {
                acc
            }
        });
    let max_idx = indices[max_pos];
    let min_idx = indices[min_pos];

    // Growth rate runs over the full plotted series, first to last bucket.
    let growth_rate_pct = if series.len() >= 2 {
        let first = series.buckets[0].value;
        let last = series.buckets[series.len() - 1].value;
        if first != 0.0 {
            (last - first) / first * 100.0
        } else {
            0.0
        }
    } else {
        0.0
    };

    let decomposition = decompose(&series.values());
    debug!(
        buckets = series.len(),
        anchored_on = values.len(),
        decomposed = decomposition.is_some(),
        "trend analysis complete"
    );

    Ok(TrendReport {
        stats: SummaryStats {
            total,
            average,
            max: Extreme {
                value: series.buckets[max_idx].value,
                date: series.buckets[max_idx].start,
                label: series.label(max_idx),
            },
            min: Extreme {
                value: series.buckets[min_idx].value,
                date: series.buckets[min_idx].start,
                label: series.label(min_idx),
            },
            growth_rate_pct,
        },
        decomposition,
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

    fn daily_series(values: &[f64]) -> BucketSeries {
        BucketSeries {
            granularity: Granularity::Day,
            buckets: values
                .iter()
                .enumerate()
                .map(|(i, &v)| Bucket {
                    start: date(2024, 1, 1) + chrono::Duration::days(i as i64),
                    value: v,
                    observed: true,
                })
                .collect(),
            value_column: "sales".to_string(),
            extras: vec![],
        }
    }

    #[test]
    fn flat_series_has_zero_growth_and_flat_trend() {
        let series = daily_series(&[100.0; 30]);
        let report = analyze_trend(&series).unwrap();

        assert_relative_eq!(report.stats.growth_rate_pct, 0.0, epsilon = 1e-10);
        assert_relative_eq!(report.stats.total, 3000.0, epsilon = 1e-10);
        assert_relative_eq!(report.stats.average, 100.0, epsilon = 1e-10);
        let decomposition = report.decomposition.unwrap();
        for t in decomposition.trend.iter().flatten() {
            assert_relative_eq!(*t, 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn growth_rate_compares_first_and_last_bucket() {
        let series = daily_series(&[50.0, 60.0, 75.0]);
        let report = analyze_trend(&series).unwrap();
        assert_relative_eq!(report.stats.growth_rate_pct, 50.0, epsilon = 1e-10);
    }

    #[test]
    fn growth_rate_is_zero_when_first_bucket_is_zero() {
        let series = daily_series(&[0.0, 60.0]);
        let report = analyze_trend(&series).unwrap();
        assert_relative_eq!(report.stats.growth_rate_pct, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn extremes_carry_their_dates() {
        let series = daily_series(&[10.0, 90.0, 30.0]);
        let report = analyze_trend(&series).unwrap();
        assert_eq!(report.stats.max.date, date(2024, 1, 2));
        assert_relative_eq!(report.stats.max.value, 90.0, epsilon = 1e-10);
        assert_eq!(report.stats.min.date, date(2024, 1, 1));
    }

    #[test]
    fn daily_stats_skip_gap_fill_buckets() {
        let mut series = daily_series(&[10.0, 0.0, 30.0]);
        series.buckets[1].observed = false;

        let report = analyze_trend(&series).unwrap();
        // The unobserved zero bucket must not count as the minimum.
        assert_relative_eq!(report.stats.min.value, 10.0, epsilon = 1e-10);
        assert_relative_eq!(report.stats.average, 20.0, epsilon = 1e-10);
    }

    #[test]
    fn monthly_stats_use_all_buckets() {
        let mut series = daily_series(&[10.0, 0.0, 30.0]);
        series.granularity = Granularity::Month;
        series.buckets[1].observed = false;

        let report = analyze_trend(&series).unwrap();
        // Coarser granularities keep the gap-fill bucket in the stats.
        assert_relative_eq!(report.stats.min.value, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn short_series_skips_decomposition() {
        let series = daily_series(&[1.0, 2.0, 3.0]);
        let report = analyze_trend(&series).unwrap();
        assert!(report.decomposition.is_none());
    }
}
