//! Multi-dimensional anomaly detection pipeline.
//!
//! Stage order: statistical scoring, spike detection, streak detection
//! over the merged markers, then capped category-balanced selection.
//! The pipeline is purely numeric; explanation text is composed
//! separately by the `reason` module.

mod score;
mod select;
mod spike;
mod streak;

pub use score::{score_series, RebalancePolicy, ScoreOutcome, ScoreSet, ScorerConfig, ScoreWeights};
pub use select::{select_anomalies, SelectedAnomaly, SelectorConfig};
pub use spike::{detect_spikes, SpikeConfig, SpikeInfo};
pub use streak::{detect_streaks, StreakConfig, StreakInfo};

use tracing::debug;

use crate::core::{AnomalyCategory, BucketSeries};

/// Configuration for the whole detection pipeline.
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    pub scorer: ScorerConfig,
    pub streak: StreakConfig,
    pub spike: SpikeConfig,
    pub selector: SelectorConfig,
    pub sampling: SamplingConfig,
}

/// Sampling guard for very long series.
#[derive(Debug, Clone, Copy)]
pub struct SamplingConfig {
    /// Above this length the series is sampled before scoring.
    pub threshold: usize,
    /// Approximate number of points to keep when sampling.
    pub target: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            threshold: 10_000,
            target: 5_000,
        }
    }
}

/// One detected anomaly, fully scored but not yet explained.
#[derive(Debug, Clone, Copy)]
pub struct DetectedAnomaly {
    /// Index into the bucket series.
    pub bucket_index: usize,
    pub category: AnomalyCategory,
    pub score: ScoreSet,
    pub streak: StreakInfo,
    pub spike: SpikeInfo,
}

/// Run the detection pipeline over an aggregated series.
pub fn detect_anomalies(series: &BucketSeries, config: &DetectorConfig) -> Vec<DetectedAnomaly> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }

    // Long series are scored on a periodic sample; bucket indices are
    // mapped back at the end.
    let step = if n > config.sampling.threshold {
        (n / config.sampling.target).max(1)
    } else {
        1
    };
    let sampled: Vec<usize> = (0..n).step_by(step).collect();
    if step > 1 {
        debug!(total = n, sampled = sampled.len(), "sampling series for anomaly detection");
    }
    let values: Vec<f64> = sampled.iter().map(|&i| series.buckets[i].value).collect();

    let outcome = score_series(&values, &config.scorer);
    let spikes = detect_spikes(&values, &config.spike);

    // Streaks run over the union of score markers and spikes so that a
    // cluster of spikes also reads as a sustained shift.
    let combined_markers: Vec<bool> = outcome
        .markers
        .iter()
        .zip(spikes.iter())
        .map(|(m, s)| *m || s.is_spike)
        .collect();
    let streaks = detect_streaks(&combined_markers, &config.streak);

    let selected = select_anomalies(
        &outcome.scores,
        &combined_markers,
        &streaks,
        &spikes,
        &config.selector,
    );

    selected
        .into_iter()
        .map(|s| DetectedAnomaly {
            bucket_index: sampled[s.index],
            category: s.category,
            score: outcome.scores[s.index],
            streak: streaks[s.index],
            spike: spikes[s.index],
        })
        .collect()
}
