//! Core data structures: time buckets and the analysis response model.

mod bucket;
mod result;

pub use bucket::{period_label, Bucket, BucketSeries, ExtraSeries, Granularity};
pub use result::{
    date_format_hint, AnalysisOutcome, AnalysisReport, AnalysisResult, AnalysisType,
    AnomalyCategory,
    AnomalyDirection, AnomalyRecord, ChartPoint, ChartSeries, CoercionSummary, Decomposition,
    Extreme, MomStats, MonthOverMonthReport, PeriodStep, StepExtreme, SummaryStats, TrendReport,
    YearOverYearReport, YearPivot,
};
