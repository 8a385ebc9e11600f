//! Serializable response model handed to the boundary layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bucket::Granularity;

/// Chart-ready view of the aggregated series plus rendering hints.
///
/// The engine produces the data model; drawing is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    pub granularity: Granularity,
    /// Suggested strftime-style axis label format for this granularity.
    pub date_format: String,
    /// Name of the plotted value column.
    pub value_label: String,
    pub points: Vec<ChartPoint>,
}

/// One plotted point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: f64,
    /// False for gap-fill points; renderers typically draw markers only on
    /// observed points and keep the connecting line continuous.
    pub observed: bool,
}

/// Summary statistics for the trend report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total: f64,
    pub average: f64,
    pub max: Extreme,
    pub min: Extreme,
    /// `(last - first) / first * 100`, 0 when undefined.
    pub growth_rate_pct: f64,
}

/// An extreme value and the period it occurred in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extreme {
    pub value: f64,
    pub date: NaiveDate,
    pub label: String,
}

/// Trend/seasonal/residual split of the aggregated series.
///
/// Trend and residual are undefined at the edges where the centered
/// moving-average window does not fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub period: usize,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

/// Trend analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub stats: SummaryStats,
    pub decomposition: Option<Decomposition>,
}

/// Year-over-year comparison output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearOverYearReport {
    /// Total per calendar year.
    pub yearly_totals: BTreeMap<i32, f64>,
    /// Mean change vs the previous year, percent, keyed by the later year.
    pub yoy_changes: BTreeMap<i32, f64>,
    /// Sub-period pivot; absent at year granularity.
    pub pivot: Option<YearPivot>,
    /// False when fewer than two years were available and the comparison
    /// could not actually compare anything.
    pub complete: bool,
}

/// Values per year per sub-period, with per-sub-period change columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearPivot {
    /// Sub-period keys (day-of-year, ISO week, month, or quarter numbers).
    pub sub_periods: Vec<u32>,
    /// One value row per year, aligned with `sub_periods`.
    pub values: BTreeMap<i32, Vec<f64>>,
    /// Percent change vs the same sub-period of the previous year.
    /// `None` where the previous year's value is zero or missing.
    pub changes: BTreeMap<i32, Vec<Option<f64>>>,
}

/// Month-over-month (sequential period) comparison output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthOverMonthReport {
    pub steps: Vec<PeriodStep>,
    pub stats: MomStats,
}

/// One sequential period with its change vs the previous period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodStep {
    pub label: String,
    pub start: NaiveDate,
    pub value: f64,
    pub prev_value: Option<f64>,
    /// `None` for the first period and whenever the previous value is 0.
    pub change_pct: Option<f64>,
}

/// Aggregate step statistics for the month-over-month report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomStats {
    pub positive_steps: usize,
    pub negative_steps: usize,
    pub flat_steps: usize,
    pub average_change_pct: Option<f64>,
    pub max_increase: Option<StepExtreme>,
    pub max_decrease: Option<StepExtreme>,
}

/// The single largest increase or decrease step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExtreme {
    pub change_pct: f64,
    pub label: String,
}

/// The comparative analysis the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Trend,
    YearOverYear,
    MonthOverMonth,
}

/// Per-analysis-type report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisReport {
    Trend(TrendReport),
    YearOverYear(YearOverYearReport),
    MonthOverMonth(MonthOverMonthReport),
}

/// Direction of a scored anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyDirection {
    Up,
    Down,
    None,
}

/// Output category used for balancing the capped anomaly list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    Rising,
    Falling,
    Spike,
}

/// One reported anomaly with its scores and ordered explanations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Granularity-formatted period label.
    pub label: String,
    pub date: NaiveDate,
    pub value: f64,
    pub combined_score: f64,
    pub zscore: f64,
    pub iqr_score: f64,
    pub mad_score: f64,
    pub votes: u32,
    pub direction: AnomalyDirection,
    pub category: AnomalyCategory,
    pub consecutive_score: f64,
    pub in_streak: bool,
    pub spike_prominence: f64,
    pub reasons: Vec<String>,
}

/// Counts of rows dropped during coercion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CoercionSummary {
    pub parsed_rows: usize,
    pub dropped_dates: usize,
    pub dropped_values: usize,
}

/// Complete analysis response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub chart: ChartSeries,
    pub report: AnalysisReport,
    /// Category-balanced, ordered, at most 20 entries.
    pub anomalies: Vec<AnomalyRecord>,
    pub coercion: CoercionSummary,
}

/// Terminal state of an analysis run.
///
/// Ineligibility and cancellation are first-class outcomes, not errors:
/// the caller may fall back to another analysis type or simply report
/// the cancellation.
#[derive(Debug, Clone, Serialize)]
pub enum AnalysisOutcome {
    Completed(Box<AnalysisResult>),
    NotEligible { reason: String },
    Cancelled,
}

impl AnalysisOutcome {
    /// Unwrap the completed result, if any.
    pub fn completed(self) -> Option<AnalysisResult> {
        match self {
            AnalysisOutcome::Completed(result) => Some(*result),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisOutcome::Cancelled)
    }
}

/// Suggested axis date format per granularity.
pub fn date_format_hint(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Day => "%Y-%m-%d",
        Granularity::Week => "%m/%d",
        Granularity::Month => "%Y-%m",
        Granularity::Quarter => "%Y Q%q",
        Granularity::Year => "%Y",
    }
}
