//! Column classification: advisory detection of date-like and numeric-like
//! columns plus recommended analysis types for the loaded data shape.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::coerce::{parse_date, parse_value, parse_value_lenient, parse_value_str};
use super::table::{Cell, RawTable};
use crate::core::AnalysisType;
use crate::error::{AnalysisError, Result};
use crate::stats;

/// Column-name fragments that strongly suggest a date column.
const DATE_KEYWORDS: [&str; 10] = [
    "date", "time", "day", "month", "year", "日期", "时间", "日", "月", "年",
];

/// Column-name fragments that sometimes carry dates (order logs and the
/// like); these need a shape check before the parse check.
const EVENT_KEYWORDS: [&str; 8] = [
    "order", "created", "updated", "paid", "下单", "支付", "发货", "签收",
];

/// Column-name fragments that suggest a numeric measure.
const VALUE_KEYWORDS: [&str; 18] = [
    "price", "amount", "quantity", "count", "sum", "total", "cost", "fee", "价", "金额", "数量",
    "成本", "费用", "合计", "总计", "件数", "单价", "sales",
];

const SAMPLE_SIZE: usize = 100;

/// Profile of a detected numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueColumnProfile {
    pub name: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub non_zero_ratio: f64,
    /// True when the column held text that had to be coerced to numbers.
    pub coerced: bool,
}

/// One recommended analysis type with a short rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub analysis: AnalysisType,
    pub description: String,
}

/// Advisory classification result for an uploaded source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    /// Names of all logical units (sheets) in the source.
    pub unit_names: Vec<String>,
    /// The unit that was classified.
    pub selected_unit: Option<String>,
    pub row_count: usize,
    pub date_columns: Vec<String>,
    pub value_columns: Vec<ValueColumnProfile>,
    pub recommended: Vec<Recommendation>,
}

/// Classify the columns of a multi-unit source.
///
/// `preferred_unit` selects a unit by name; otherwise the first unit is
/// used (matching how a spreadsheet boundary defaults to the first sheet).
pub fn classify_columns(tables: &[RawTable], preferred_unit: Option<&str>) -> Result<ColumnReport> {
    let table = match preferred_unit {
        Some(name) => tables
            .iter()
            .find(|t| t.name.as_deref() == Some(name))
            .or_else(|| tables.first()),
        None => tables.first(),
    }
    .ok_or(AnalysisError::EmptyInput)?;

    let unit_names: Vec<String> = tables.iter().filter_map(|t| t.name.clone()).collect();

    let mut date_columns = Vec::new();
    for name in &table.columns {
        if detect_date_column(table, name) {
            date_columns.push(name.clone());
        }
    }

    let mut value_columns = Vec::new();
    for name in &table.columns {
        if date_columns.contains(name) {
            continue;
        }
        if let Some(profile) = profile_numeric_column(table, name) {
            value_columns.push(profile);
        }
    }

    debug!(
        dates = date_columns.len(),
        values = value_columns.len(),
        rows = table.row_count(),
        "classified columns"
    );

    let recommended = recommend(table, &date_columns, &value_columns);

    Ok(ColumnReport {
        unit_names,
        selected_unit: table.name.clone(),
        row_count: table.row_count(),
        date_columns,
        value_columns,
        recommended,
    })
}

fn detect_date_column(table: &RawTable, name: &str) -> bool {
    let lower = name.to_lowercase();
    let named_as_date = DATE_KEYWORDS.iter().any(|k| lower.contains(k));
    let named_as_event = EVENT_KEYWORDS.iter().any(|k| lower.contains(k));
    if !named_as_date && !named_as_event {
        return false;
    }

    let cells = match table.column(name) {
        Ok(cells) => cells,
        Err(_) => return false,
    };
    let sample: Vec<&Cell> = cells
        .iter()
        .filter(|c| !c.is_empty())
        .take(SAMPLE_SIZE)
        .copied()
        .collect();
    if sample.is_empty() {
        return false;
    }

    // Event-named columns first need to look date-shaped at all before we
    // pay for the full parse check.
    if !named_as_date {
        let shaped = sample
            .iter()
            .take(10)
            .filter(|c| c.as_text().map(|t| is_date_shaped(&t)).unwrap_or(false))
            .count();
        let checked = sample.len().min(10);
        if (shaped as f64) / checked as f64 <= 0.5 {
            return false;
        }
    }

    let parsed = sample.iter().filter(|c| parse_date(c).is_some()).count();
    parsed as f64 / sample.len() as f64 >= 0.8
}

/// Rough test for a date-looking string: digits around a recognized
/// year/month separator.
fn is_date_shaped(s: &str) -> bool {
    let has_digit = s.chars().any(|c| c.is_ascii_digit());
    let has_separator = s.contains('-') || s.contains('/') || s.contains('年');
    has_digit && has_separator
}

fn profile_numeric_column(table: &RawTable, name: &str) -> Option<ValueColumnProfile> {
    let cells = table.column(name).ok()?;
    let non_empty: Vec<&Cell> = cells.iter().filter(|c| !c.is_empty()).copied().collect();
    if non_empty.is_empty() {
        return None;
    }

    let native_count = non_empty
        .iter()
        .filter(|c| matches!(c, Cell::Number(_)))
        .count();
    let native = native_count as f64 / non_empty.len() as f64 >= 0.9;

    let lower = name.to_lowercase();
    let value_named = VALUE_KEYWORDS.iter().any(|k| lower.contains(k));

    let mut coerced = false;
    let parsed: Vec<f64> = if native {
        non_empty.iter().filter_map(|c| parse_value(c)).collect()
    } else {
        let sample: Vec<String> = non_empty
            .iter()
            .take(SAMPLE_SIZE)
            .filter_map(|c| c.as_text())
            .collect();
        let strict_rate = sample
            .iter()
            .filter(|s| parse_value_str(s).is_some())
            .count() as f64
            / sample.len().max(1) as f64;

        if strict_rate >= 0.7 {
            coerced = true;
            non_empty.iter().filter_map(|c| parse_value(c)).collect()
        } else if value_named {
            // Value-named columns get a relaxed, strip-everything parse.
            let lenient_rate = sample
                .iter()
                .filter(|s| parse_value_lenient(s).is_some())
                .count() as f64
                / sample.len().max(1) as f64;
            if lenient_rate >= 0.6 {
                coerced = true;
                non_empty
                    .iter()
                    .filter_map(|c| c.as_text().and_then(|t| parse_value_lenient(&t)))
                    .collect()
            } else {
                return None;
            }
        } else {
            return None;
        }
    };

    if parsed.is_empty() {
        return None;
    }

    let non_zero = parsed.iter().filter(|v| **v != 0.0).count();
    let non_zero_ratio = non_zero as f64 / parsed.len() as f64;
    if non_zero_ratio <= 0.05 {
        return None;
    }

    let avg = stats::mean(&parsed);
    let min = parsed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = parsed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !avg.is_finite() || !min.is_finite() || !max.is_finite() {
        return None;
    }

    Some(ValueColumnProfile {
        name: name.to_string(),
        avg,
        min,
        max,
        non_zero_ratio,
        coerced,
    })
}

fn recommend(
    table: &RawTable,
    date_columns: &[String],
    value_columns: &[ValueColumnProfile],
) -> Vec<Recommendation> {
    let mut recommended = Vec::new();
    if date_columns.is_empty() || value_columns.is_empty() {
        return recommended;
    }

    recommended.push(Recommendation {
        analysis: AnalysisType::Trend,
        description: "How the value changes over time".to_string(),
    });

    let dates: Vec<chrono::NaiveDate> = table
        .column(&date_columns[0])
        .map(|cells| cells.iter().filter_map(|c| parse_date(c)).collect())
        .unwrap_or_default();

    let years: HashSet<i32> = dates.iter().map(|d| d.year()).collect();
    if years.len() >= 2 {
        recommended.push(Recommendation {
            analysis: AnalysisType::YearOverYear,
            description: "Compare the same periods across years".to_string(),
        });
    }

    let months: HashSet<(i32, u32)> = dates.iter().map(|d| (d.year(), d.month())).collect();
    if months.len() >= 2 {
        recommended.push(Recommendation {
            analysis: AnalysisType::MonthOverMonth,
            description: "Compare adjacent periods".to_string(),
        });
    }

    recommended
}
