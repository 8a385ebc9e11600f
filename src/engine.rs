//! The analysis engine: one synchronous run from raw table to
//! `AnalysisResult`, with cooperative cancellation checkpoints between
//! stages.

use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregate::{aggregate_series, coerce_table, reduce_for_scale};
use crate::analyze::{analyze_month_over_month, analyze_trend, analyze_year_over_year, build_chart};
use crate::anomaly::{detect_anomalies, DetectorConfig};
use crate::cancel::{CallerIdentity, CancellationToken, RunRegistry};
use crate::core::{
    AnalysisOutcome, AnalysisReport, AnalysisResult, AnalysisType, AnomalyRecord, BucketSeries,
    Granularity,
};
use crate::error::{AnalysisError, Result};
use crate::ingest::RawTable;
use crate::reason::{ReasonComposer, ReasonConfig};

/// One analysis request, the engine's full input contract.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub table: RawTable,
    pub date_column: String,
    pub value_column: String,
    pub analysis_type: AnalysisType,
    pub granularity: Granularity,
    /// Additional numeric columns carried through aggregation for
    /// correlation insights; unknown names are ignored.
    pub extra_columns: Vec<String>,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub reasons: ReasonConfig,
}

/// The sales time-series analysis engine.
///
/// The run registry is injected by the surrounding service rather than
/// held as process-global state; concurrent runs share nothing else.
pub struct AnalysisEngine {
    registry: Arc<RunRegistry>,
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(registry: Arc<RunRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<RunRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// Execute one analysis run to completion, cancellation or error.
    pub fn run(&self, request: &AnalysisRequest, caller: CallerIdentity) -> Result<AnalysisOutcome> {
        self.run_with_token(request, caller, CancellationToken::new())
    }

    /// Execute a run under a caller-owned cancellation token.
    ///
    /// The registry entry is registered before the first checkpoint and
    /// released on every exit path (the guard handles error and panic
    /// unwinding paths too).
    pub fn run_with_token(
        &self,
        request: &AnalysisRequest,
        caller: CallerIdentity,
        token: CancellationToken,
    ) -> Result<AnalysisOutcome> {
        // A new run clears any stale process-wide cancel signal.
        self.registry.reset_global();
        let _guard = self.registry.register_with(caller, token.clone());

        // Checkpoint: after load/registration.
        if self.cancelled(&token) {
            return Ok(AnalysisOutcome::Cancelled);
        }

        let rows = coerce_table(
            &request.table,
            &request.date_column,
            &request.value_column,
            &request.extra_columns,
        )?;
        let coercion = rows.summary;

        // Checkpoint: after date/value coercion.
        if self.cancelled(&token) {
            return Ok(AnalysisOutcome::Cancelled);
        }

        let rows = reduce_for_scale(rows);
        let mut series = aggregate_series(&rows, request.granularity)?;
        series.value_column = request.value_column.clone();

        // Checkpoint: after aggregation.
        if self.cancelled(&token) {
            return Ok(AnalysisOutcome::Cancelled);
        }

        let report = match request.analysis_type {
            AnalysisType::Trend => AnalysisReport::Trend(analyze_trend(&series)?),
            AnalysisType::YearOverYear => match analyze_year_over_year(&series) {
                Ok(report) => AnalysisReport::YearOverYear(report),
                // Too few years is an eligibility verdict, not a failure:
                // the caller may fall back to trend analysis.
                Err(AnalysisError::InsufficientData { needed, got }) => {
                    return Ok(AnalysisOutcome::NotEligible {
                        reason: format!(
                            "year-over-year comparison needs at least {needed} distinct years, got {got}"
                        ),
                    });
                }
                Err(e) => return Err(e),
            },
            AnalysisType::MonthOverMonth => {
                AnalysisReport::MonthOverMonth(analyze_month_over_month(&series)?)
            }
        };

        // Checkpoint: after the comparative analyzer.
        if self.cancelled(&token) {
            return Ok(AnalysisOutcome::Cancelled);
        }

        let detected = detect_anomalies(&series, &self.config.detector);

        // Checkpoint: after anomaly detection.
        if self.cancelled(&token) {
            return Ok(AnalysisOutcome::Cancelled);
        }

        let anomalies = self.explain(&series, detected);
        info!(
            buckets = series.len(),
            anomalies = anomalies.len(),
            "analysis run complete"
        );

        Ok(AnalysisOutcome::Completed(Box::new(AnalysisResult {
            chart: build_chart(&series),
            report,
            anomalies,
            coercion,
        })))
    }

    fn cancelled(&self, token: &CancellationToken) -> bool {
        let cancelled = token.is_cancelled() || self.registry.globally_cancelled();
        if cancelled {
            debug!("run cancelled at checkpoint");
        }
        cancelled
    }

    /// Attach composed reasons and build the output records.
    fn explain(
        &self,
        series: &BucketSeries,
        detected: Vec<crate::anomaly::DetectedAnomaly>,
    ) -> Vec<AnomalyRecord> {
        let mut composer = ReasonComposer::new(self.config.reasons.clone());
        detected
            .into_iter()
            .map(|anomaly| {
                let reasons = composer.compose(series, &anomaly);
                let idx = anomaly.bucket_index;
                AnomalyRecord {
                    label: series.label(idx),
                    date: series.buckets[idx].start,
                    value: series.buckets[idx].value,
                    combined_score: anomaly.score.combined,
                    zscore: anomaly.score.zscore,
                    iqr_score: anomaly.score.iqr_score,
                    mad_score: anomaly.score.mad_score,
                    votes: anomaly.score.votes,
                    direction: anomaly.score.direction,
                    category: anomaly.category,
                    consecutive_score: anomaly.streak.consecutive_score,
                    in_streak: anomaly.streak.in_streak,
                    spike_prominence: anomaly.spike.prominence,
                    reasons,
                }
            })
            .collect()
    }
}
