//! Time aggregation: bucket coerced rows into a contiguous, gap-filled
//! series at the requested granularity.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::core::{Bucket, BucketSeries, CoercionSummary, ExtraSeries, Granularity};
use crate::error::{AnalysisError, Result};
use crate::ingest::{parse_date, parse_value, RawTable};

/// Row data after date/value coercion, before bucketing.
///
/// Kept column-major: `dates`, `values` and each extra column are aligned
/// by index. Extra cells that fail to parse contribute 0 (sums skip them).
#[derive(Debug, Clone)]
pub struct CoercedRows {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub extras: Vec<(String, Vec<f64>)>,
    pub summary: CoercionSummary,
}

/// Coerce a raw table's date and value columns, dropping unparseable rows.
///
/// `extra_columns` names additional numeric columns to carry along for
/// correlation analysis; they never cause a row to drop.
pub fn coerce_table(
    table: &RawTable,
    date_column: &str,
    value_column: &str,
    extra_columns: &[String],
) -> Result<CoercedRows> {
    if table.rows.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let date_idx = table
        .column_index(date_column)
        .ok_or_else(|| AnalysisError::ColumnNotFound(date_column.to_string()))?;
    let value_idx = table
        .column_index(value_column)
        .ok_or_else(|| AnalysisError::ColumnNotFound(value_column.to_string()))?;
    let extra_idx: Vec<(String, usize)> = extra_columns
        .iter()
        .filter(|name| *name != date_column && *name != value_column)
        .filter_map(|name| table.column_index(name).map(|i| (name.clone(), i)))
        .collect();

    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut extras: Vec<(String, Vec<f64>)> = extra_idx
        .iter()
        .map(|(name, _)| (name.clone(), Vec::new()))
        .collect();
    let mut dropped_dates = 0usize;
    let mut dropped_values = 0usize;

    for row in &table.rows {
        let Some(date) = parse_date(&row[date_idx]) else {
            dropped_dates += 1;
            continue;
        };
        let Some(value) = parse_value(&row[value_idx]) else {
            dropped_values += 1;
            continue;
        };
        dates.push(date);
        values.push(value);
        for (slot, (_, idx)) in extras.iter_mut().zip(extra_idx.iter()) {
            slot.1.push(parse_value(&row[*idx]).unwrap_or(0.0));
        }
    }

    if dropped_dates > 0 || dropped_values > 0 {
        warn!(
            dropped_dates,
            dropped_values,
            kept = dates.len(),
            "dropped unparseable rows during coercion"
        );
    }
    if dates.is_empty() {
        return Err(AnalysisError::NoValidRows {
            dropped_dates,
            dropped_values,
        });
    }

    Ok(CoercedRows {
        summary: CoercionSummary {
            parsed_rows: dates.len(),
            dropped_dates,
            dropped_values,
        },
        dates,
        values,
        extras,
    })
}

/// Pre-reduce very large inputs before bucketing.
///
/// Above 100k rows the series is collapsed to one point per day; above
/// 500k rows it is further resampled to ISO-week windows (spans over
/// 1000 days) or 3-day windows (spans over 365 days). Totals are
/// preserved; only the point dates coarsen. Extra columns are shed here,
/// matching the memory-pressure path of wide uploads.
pub fn reduce_for_scale(rows: CoercedRows) -> CoercedRows {
    let n = rows.dates.len();
    if n <= 100_000 {
        return rows;
    }
    debug!(rows = n, "large input: pre-reducing by day before bucketing");

    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in rows.dates.iter().zip(rows.values.iter()) {
        *by_day.entry(*date).or_insert(0.0) += value;
    }

    let mut dates: Vec<NaiveDate> = by_day.keys().copied().collect();
    let mut values: Vec<f64> = by_day.values().copied().collect();

    if n > 500_000 {
        let span_days = (*dates.last().unwrap() - dates[0]).num_days();
        if span_days > 1000 {
            debug!("resampling to ISO-week windows");
            (dates, values) = regroup(&dates, &values, |d| {
                let iso = d.iso_week();
                (iso.year() as i64) * 100 + iso.week() as i64
            });
        } else if span_days > 365 {
            debug!("resampling to 3-day windows");
            let origin = dates[0];
            (dates, values) = regroup(&dates, &values, |d| (*d - origin).num_days() / 3);
        }
    }

    CoercedRows {
        dates,
        values,
        extras: Vec::new(),
        summary: rows.summary,
    }
}

/// Group sorted points by a window key, keeping each window's first date.
fn regroup<K: PartialEq>(
    dates: &[NaiveDate],
    values: &[f64],
    key: impl Fn(&NaiveDate) -> K,
) -> (Vec<NaiveDate>, Vec<f64>) {
    let mut out_dates = Vec::new();
    let mut out_values = Vec::new();
    let mut current: Option<K> = None;
    for (date, value) in dates.iter().zip(values.iter()) {
        let k = key(date);
        if current.as_ref() == Some(&k) {
            *out_values.last_mut().unwrap() += value;
        } else {
            current = Some(k);
            out_dates.push(*date);
            out_values.push(*value);
        }
    }
    (out_dates, out_values)
}

/// Bucket coerced rows into a contiguous series at `granularity`.
///
/// Every period between the earliest and latest observed date gets exactly
/// one bucket; periods with no rows are zero-filled and marked unobserved
/// so downstream statistics can tell real data from fill.
pub fn aggregate_series(rows: &CoercedRows, granularity: Granularity) -> Result<BucketSeries> {
    if rows.dates.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in rows.dates.iter().zip(rows.values.iter()) {
        let start = granularity.period_start(*date);
        *sums.entry(start).or_insert(0.0) += value;
    }

    let mut extra_sums: Vec<(String, BTreeMap<NaiveDate, f64>)> = rows
        .extras
        .iter()
        .map(|(name, _)| (name.clone(), BTreeMap::new()))
        .collect();
    for (slot, (_, column)) in extra_sums.iter_mut().zip(rows.extras.iter()) {
        for (date, value) in rows.dates.iter().zip(column.iter()) {
            let start = granularity.period_start(*date);
            *slot.1.entry(start).or_insert(0.0) += value;
        }
    }

    let first = *sums.keys().next().expect("non-empty sums");
    let last = *sums.keys().next_back().expect("non-empty sums");

    let mut buckets = Vec::new();
    let mut extra_values: Vec<Vec<f64>> = vec![Vec::new(); extra_sums.len()];
    let mut cursor = first;
    loop {
        match sums.get(&cursor) {
            Some(&value) => buckets.push(Bucket {
                start: cursor,
                value,
                observed: true,
            }),
            None => buckets.push(Bucket {
                start: cursor,
                value: 0.0,
                observed: false,
            }),
        }
        for (slot, (_, col_sums)) in extra_values.iter_mut().zip(extra_sums.iter()) {
            slot.push(col_sums.get(&cursor).copied().unwrap_or(0.0));
        }
        if cursor == last {
            break;
        }
        cursor = granularity.next_period_start(cursor);
    }

    let observed = buckets.iter().filter(|b| b.observed).count();
    debug!(
        granularity = granularity.unit_name(),
        buckets = buckets.len(),
        observed,
        "aggregated series"
    );

    Ok(BucketSeries {
        granularity,
        buckets,
        value_column: String::new(),
        extras: extra_sums
            .into_iter()
            .zip(extra_values)
            .map(|((name, _), values)| ExtraSeries { name, values })
            .collect(),
    })
}

/// Convenience: coerce, scale-reduce and bucket a table in one call.
pub fn aggregate_table(
    table: &RawTable,
    date_column: &str,
    value_column: &str,
    extra_columns: &[String],
    granularity: Granularity,
) -> Result<(BucketSeries, CoercionSummary)> {
    let rows = coerce_table(table, date_column, value_column, extra_columns)?;
    let summary = rows.summary;
    let rows = reduce_for_scale(rows);
    let mut series = aggregate_series(&rows, granularity)?;
    series.value_column = value_column.to_string();
    Ok((series, summary))
}
