//! Time buckets: calendar-aligned periods holding aggregated values.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed time-period size used for aggregation.
///
/// Chosen once per analysis run and never changed mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    /// Align a date to the start of its period.
    ///
    /// Weeks start on Monday; quarters on Jan/Apr/Jul/Oct 1.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Granularity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .expect("first of month is always valid"),
            Granularity::Quarter => {
                let quarter_month = (date.month() - 1) / 3 * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), quarter_month, 1)
                    .expect("first of quarter is always valid")
            }
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)
                .expect("first of year is always valid"),
        }
    }

    /// Start of the period immediately following the one containing `start`.
    ///
    /// `start` must already be period-aligned.
    pub fn next_period_start(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => start + Duration::days(1),
            Granularity::Week => start + Duration::days(7),
            Granularity::Month => add_months(start, 1),
            Granularity::Quarter => add_months(start, 3),
            Granularity::Year => NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                .expect("first of year is always valid"),
        }
    }

    /// Human-readable unit name used in explanation phrases.
    pub fn unit_name(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is always valid")
}

/// Format a period start date as a display label for its granularity.
pub fn period_label(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => start.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let iso = start.iso_week();
            let end = start + Duration::days(6);
            format!(
                "{} W{:02} ({}\u{2013}{})",
                iso.year(),
                iso.week(),
                start.format("%b %-d"),
                end.format("%b %-d")
            )
        }
        Granularity::Month => start.format("%Y-%m").to_string(),
        Granularity::Quarter => {
            format!("{} Q{}", start.year(), (start.month() - 1) / 3 + 1)
        }
        Granularity::Year => start.year().to_string(),
    }
}

/// One aggregated period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Calendar-aligned start of the period.
    pub start: NaiveDate,
    /// Sum of coerced values falling into the period.
    pub value: f64,
    /// True iff at least one raw row's date maps into this period.
    /// Gap-fill buckets carry `value = 0.0` and `observed = false`.
    pub observed: bool,
}

/// A contiguous, ordered sequence of buckets at a fixed granularity.
#[derive(Debug, Clone)]
pub struct BucketSeries {
    pub granularity: Granularity,
    pub buckets: Vec<Bucket>,
    /// Name of the aggregated value column.
    pub value_column: String,
    /// Additional numeric columns aggregated over the same bucket
    /// boundaries, used for correlation insights.
    pub extras: Vec<ExtraSeries>,
}

/// A secondary numeric column aggregated alongside the value column.
#[derive(Debug, Clone)]
pub struct ExtraSeries {
    pub name: String,
    /// One entry per bucket, same order as `BucketSeries::buckets`.
    pub values: Vec<f64>,
}

impl BucketSeries {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Aggregated values in bucket order.
    pub fn values(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.value).collect()
    }

    /// Indices of observed buckets.
    pub fn observed_indices(&self) -> Vec<usize> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.observed)
            .map(|(i, _)| i)
            .collect()
    }

    /// Display label for the bucket at `index`.
    pub fn label(&self, index: usize) -> String {
        period_label(self.buckets[index].start, self.granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_start_aligns_each_granularity() {
        let d = date(2024, 5, 17); // a Friday
        assert_eq!(Granularity::Day.period_start(d), d);
        assert_eq!(Granularity::Week.period_start(d), date(2024, 5, 13));
        assert_eq!(Granularity::Month.period_start(d), date(2024, 5, 1));
        assert_eq!(Granularity::Quarter.period_start(d), date(2024, 4, 1));
        assert_eq!(Granularity::Year.period_start(d), date(2024, 1, 1));
    }

    #[test]
    fn week_start_is_monday_even_on_monday() {
        let monday = date(2024, 5, 13);
        assert_eq!(Granularity::Week.period_start(monday), monday);
    }

    #[test]
    fn next_period_start_rolls_over_boundaries() {
        assert_eq!(
            Granularity::Month.next_period_start(date(2023, 12, 1)),
            date(2024, 1, 1)
        );
        assert_eq!(
            Granularity::Quarter.next_period_start(date(2023, 10, 1)),
            date(2024, 1, 1)
        );
        assert_eq!(
            Granularity::Year.next_period_start(date(2023, 1, 1)),
            date(2024, 1, 1)
        );
        assert_eq!(
            Granularity::Day.next_period_start(date(2024, 2, 28)),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn period_labels_follow_granularity() {
        assert_eq!(period_label(date(2024, 1, 9), Granularity::Day), "2024-01-09");
        assert_eq!(period_label(date(2024, 1, 1), Granularity::Month), "2024-01");
        assert_eq!(
            period_label(date(2024, 4, 1), Granularity::Quarter),
            "2024 Q2"
        );
        assert_eq!(period_label(date(2024, 1, 1), Granularity::Year), "2024");
        let week = period_label(date(2024, 1, 8), Granularity::Week);
        assert!(week.starts_with("2024 W02"), "got {week}");
    }

    #[test]
    fn series_observed_indices_skip_gap_fill() {
        let series = BucketSeries {
            granularity: Granularity::Day,
            buckets: vec![
                Bucket { start: date(2024, 1, 1), value: 5.0, observed: true },
                Bucket { start: date(2024, 1, 2), value: 0.0, observed: false },
                Bucket { start: date(2024, 1, 3), value: 7.0, observed: true },
            ],
            value_column: "sales".to_string(),
            extras: vec![],
        };
        assert_eq!(series.observed_indices(), vec![0, 2]);
        assert_eq!(series.values(), vec![5.0, 0.0, 7.0]);
    }
}
