//! Comparative analyzers over the aggregated series.
//!
//! Three peer engines consume the same bucket sequence:
//! - trend: totals, extremes, growth rate, optional decomposition
//! - year-over-year: sub-period pivot across calendar years
//! - month-over-month: sequential period change rates

mod decompose;
mod month_over_month;
mod trend;
mod year_over_year;

pub use decompose::{decompose, MIN_DECOMPOSE_LEN};
pub use month_over_month::analyze_month_over_month;
pub use trend::analyze_trend;
pub use year_over_year::analyze_year_over_year;

use crate::core::{date_format_hint, BucketSeries, ChartPoint, ChartSeries};

/// Build the chart-ready view of an aggregated series.
pub fn build_chart(series: &BucketSeries) -> ChartSeries {
    ChartSeries {
        granularity: series.granularity,
        date_format: date_format_hint(series.granularity).to_string(),
        value_label: series.value_column.clone(),
        points: series
            .buckets
            .iter()
            .enumerate()
            .map(|(i, bucket)| ChartPoint {
                date: bucket.start,
                label: series.label(i),
                value: bucket.value,
                observed: bucket.observed,
            })
            .collect(),
    }
}
