//! Correlation insights: relate an anomaly to the other numeric columns
//! over a local window, with time-pattern fallbacks when no dimension
//! correlates strongly enough.

use chrono::Datelike;

use crate::core::{BucketSeries, Granularity};
use crate::stats::{mean, pearson, spearman, std_dev};

/// Local analysis window (lookback, lookforward) per granularity.
fn correlation_window(granularity: Granularity) -> (usize, usize) {
    match granularity {
        Granularity::Day => (14, 7),
        Granularity::Week => (8, 4),
        Granularity::Month => (6, 3),
        Granularity::Quarter => (4, 2),
        Granularity::Year => (3, 1),
    }
}

struct DimensionCorrelation {
    name: String,
    avg_corr: f64,
    pearson: f64,
    change_pct: f64,
}

/// Compose correlation insights for the anomaly at `idx`.
///
/// Reports at most `max_insights` dimensions with mean |r| >= 0.5; when
/// none qualify, falls back to time-pattern observations and finally a
/// generic no-correlation sentence, so the list is never empty.
pub fn correlation_insights(
    series: &BucketSeries,
    idx: usize,
    max_insights: usize,
) -> Vec<String> {
    let mut insights = Vec::new();
    let values = series.values();
    let n = values.len();
    let (lookback, lookforward) = correlation_window(series.granularity);
    let start = idx.saturating_sub(lookback);
    let end = (idx + lookforward).min(n - 1);
    let window_values = &values[start..=end];

    let mut correlated: Vec<DimensionCorrelation> = Vec::new();
    for extra in &series.extras {
        let window_dim = &extra.values[start..=end];
        if std_dev(window_dim) <= 0.0 || std_dev(window_values) <= 0.0 {
            continue;
        }
        let (Some(p), Some(s)) = (
            pearson(window_dim, window_values),
            spearman(window_dim, window_values),
        ) else {
            continue;
        };
        let avg_corr = (p.abs() + s.abs()) / 2.0;
        if avg_corr < 0.5 || idx <= start {
            continue;
        }
        let before_avg = mean(&extra.values[start..idx]);
        if before_avg <= 0.0 {
            continue;
        }
        let change_pct = (extra.values[idx] - before_avg) / before_avg * 100.0;
        correlated.push(DimensionCorrelation {
            name: extra.name.clone(),
            avg_corr,
            pearson: p,
            change_pct,
        });
    }

    correlated.sort_by(|a, b| {
        b.avg_corr
            .partial_cmp(&a.avg_corr)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for dim in correlated.iter().take(max_insights) {
        let strength = if dim.avg_corr > 0.8 { "strongly" } else { "moderately" };
        let relation = if dim.pearson > 0.0 { "positively" } else { "negatively" };
        let change_desc = if dim.change_pct > 30.0 {
            "rose sharply"
        } else if dim.change_pct > 10.0 {
            "rose"
        } else if dim.change_pct < -30.0 {
            "fell sharply"
        } else if dim.change_pct < -10.0 {
            "fell"
        } else {
            "was roughly flat"
        };
        let friendly = dim.name.replace('_', " ");
        insights.push(format!(
            "{friendly} is {strength} {relation} correlated with sales and {change_desc} before the anomaly ({:.1}%); a plausible driver",
            dim.change_pct.abs()
        ));
    }

    if !insights.is_empty() {
        return insights;
    }

    // Time-pattern fallbacks.
    let date = series.buckets[idx].start;
    match series.granularity {
        Granularity::Day => {
            // Compare against earlier same-weekday values in the window.
            let weekday = date.weekday();
            let same_weekday: Vec<f64> = (start..idx)
                .filter(|&i| series.buckets[i].start.weekday() == weekday)
                .map(|i| values[i])
                .collect();
            if !same_weekday.is_empty() {
                let weekday_avg = mean(&same_weekday);
                if weekday_avg > 0.0 {
                    let weekday_change = (values[idx] - weekday_avg) / weekday_avg * 100.0;
                    if weekday_change.abs() > 20.0 {
                        insights.push(format!(
                            "sales changed {weekday_change:.1}% vs the past {} {}s; the weekly pattern broke",
                            same_weekday.len(),
                            date.format("%A"),
                        ));
                    }
                }
            }
            if date.day() <= 5 {
                insights.push(
                    "the anomaly falls at the start of the month, pointing at budget release or purchasing cycles"
                        .to_string(),
                );
            } else if date.day() >= 25 {
                insights.push(
                    "the anomaly falls at the end of the month, pointing at a sales push or budget exhaustion"
                        .to_string(),
                );
            }
        }
        Granularity::Month => {
            let season = match date.month() {
                12 | 1 | 2 => "winter",
                3..=5 => "spring",
                6..=8 => "summer",
                _ => "autumn",
            };
            insights.push(format!(
                "the anomaly falls in month {} ({season}); seasonal factors are plausible",
                date.month()
            ));
        }
        _ => {}
    }

    if insights.is_empty() {
        insights.push(
            "no strong cross-metric correlation detected; the anomaly may stem from external factors or unrecorded variables"
                .to_string(),
        );
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bucket, ExtraSeries};
    use chrono::NaiveDate;

    fn daily_series(values: Vec<f64>, extras: Vec<ExtraSeries>) -> BucketSeries {
        BucketSeries {
            granularity: Granularity::Day,
            buckets: values
                .iter()
                .enumerate()
                .map(|(i, &v)| Bucket {
                    start: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
                        + chrono::Duration::days(i as i64),
                    value: v,
                    observed: true,
                })
                .collect(),
            value_column: "sales".to_string(),
            extras,
        }
    }

    #[test]
    fn tracking_dimension_is_reported_as_driver() {
        // ad_spend tracks sales perfectly and jumps with it.
        let values: Vec<f64> = (0..30)
            .map(|i| if i == 20 { 500.0 } else { 100.0 + (i % 3) as f64 })
            .collect();
        let ad_spend: Vec<f64> = values.iter().map(|v| v / 10.0).collect();
        let series = daily_series(
            values,
            vec![ExtraSeries {
                name: "ad_spend".to_string(),
                values: ad_spend,
            }],
        );

        let insights = correlation_insights(&series, 20, 3);
        assert!(
            insights[0].contains("ad spend") && insights[0].contains("strongly"),
            "got {insights:?}"
        );
        assert!(insights[0].contains("positively"));
    }

    #[test]
    fn weak_correlation_falls_back_to_time_patterns() {
        // Noise dimension that does not track sales.
        let values: Vec<f64> = (0..30)
            .map(|i| if i == 20 { 500.0 } else { 100.0 + (i % 3) as f64 })
            .collect();
        let noise: Vec<f64> = (0..30).map(|i| ((i * 7919) % 13) as f64).collect();
        let series = daily_series(
            values,
            vec![ExtraSeries {
                name: "temperature".to_string(),
                values: noise,
            }],
        );

        let insights = correlation_insights(&series, 20, 3);
        assert!(!insights.is_empty());
        assert!(insights.iter().all(|i| !i.contains("temperature")));
    }

    #[test]
    fn no_extras_yields_generic_or_pattern_insight() {
        let values = vec![100.0; 30];
        let series = daily_series(values, vec![]);
        let insights = correlation_insights(&series, 15, 3);
        assert_eq!(insights.len(), 1);
    }

    #[test]
    fn insight_count_is_capped() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let extras = (0..5)
            .map(|k| ExtraSeries {
                name: format!("metric_{k}"),
                values: values.iter().map(|v| v * (k + 1) as f64).collect(),
            })
            .collect();
        let series = daily_series(values, extras);
        let insights = correlation_insights(&series, 20, 3);
        assert!(insights.len() <= 3);
    }
}
