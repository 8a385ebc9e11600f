//! Multi-dimensional statistical anomaly scoring.
//!
//! Three scale-normalized scores per point (z-score, IQR-score,
//! MAD-score) blend into a combined score; a vote count across the
//! individual scores gates eligibility, and the signed z-score supplies
//! the direction.

use tracing::warn;

use crate::core::AnomalyDirection;
use crate::stats::{mad, mean, median, percentile, std_dev};

/// Weights for blending the three scores into the combined score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub zscore: f64,
    pub iqr: f64,
    pub mad: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            zscore: 0.5,
            iqr: 0.3,
            mad: 0.2,
        }
    }
}

/// Policy for rebalancing a directionally skewed detection.
///
/// A heuristic, not a statistical guarantee: when one direction dominates
/// the provisional detections, the minority direction's threshold is
/// relaxed so that it is not crowded out entirely. Pluggable so callers
/// can tune or disable it without touching the scoring math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RebalancePolicy {
    Disabled,
    /// Relax the minority direction's threshold by `factor` when the
    /// majority outnumbers it by more than `ratio` to one.
    RelaxMinority { factor: f64, ratio: f64 },
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        RebalancePolicy::RelaxMinority {
            factor: 0.85,
            ratio: 2.0,
        }
    }
}

/// Configuration for the statistical scorer.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Combined-score threshold for flagging a point.
    pub threshold: f64,
    /// Per-score threshold counted into the vote.
    pub vote_threshold: f64,
    /// Minimum votes before a point is eligible at all.
    pub min_votes: u32,
    pub weights: ScoreWeights,
    pub rebalance: RebalancePolicy,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            threshold: 2.5,
            vote_threshold: 2.5,
            min_votes: 2,
            weights: ScoreWeights::default(),
            rebalance: RebalancePolicy::default(),
        }
    }
}

/// Scores for one point.
#[derive(Debug, Clone, Copy)]
pub struct ScoreSet {
    /// Signed z-score; the sign carries the anomaly direction.
    pub raw_zscore: f64,
    /// |z|
    pub zscore: f64,
    pub iqr_score: f64,
    pub mad_score: f64,
    pub combined: f64,
    pub votes: u32,
    pub direction: AnomalyDirection,
}

/// Scoring result for a whole series.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub scores: Vec<ScoreSet>,
    /// Final thresholds after rebalancing.
    pub threshold_up: f64,
    pub threshold_down: f64,
    /// True where the point is flagged as a directional anomaly.
    pub markers: Vec<bool>,
}

/// Score a value series.
pub fn score_series(values: &[f64], config: &ScorerConfig) -> ScoreOutcome {
    let n = values.len();
    let m = mean(values);
    let sd = std_dev(values);

    let raw_z: Vec<f64> = if n < 2 || !sd.is_finite() || sd < 1e-12 {
        vec![0.0; n]
    } else {
        values.iter().map(|x| (x - m) / sd).collect()
    };

    let med = median(values);
    let q1 = percentile(values, 25.0);
    let q3 = percentile(values, 75.0);
    let iqr = q3 - q1;
    let iqr_scores: Vec<f64> = if n == 0 || !iqr.is_finite() || iqr < 1e-12 {
        vec![0.0; n]
    } else {
        // 1.349 rescales the IQR to standard-deviation units.
        values
            .iter()
            .map(|x| (x - med).abs() / (iqr / 1.349))
            .collect()
    };

    let mad_raw = mad(values);
    let mad_scores: Vec<f64> = if n == 0 || !mad_raw.is_finite() || mad_raw < 1e-12 {
        vec![0.0; n]
    } else {
        // 1.4826 rescales the MAD to standard-deviation units.
        values
            .iter()
            .map(|x| (x - med).abs() / (mad_raw * 1.4826))
            .collect()
    };

    let mut scores: Vec<ScoreSet> = (0..n)
        .map(|i| {
            let zscore = raw_z[i].abs();
            let combined = config.weights.zscore * zscore
                + config.weights.iqr * iqr_scores[i]
                + config.weights.mad * mad_scores[i];
            let votes = [zscore, iqr_scores[i], mad_scores[i]]
                .iter()
                .filter(|s| **s > config.vote_threshold)
                .count() as u32;
            ScoreSet {
                raw_zscore: raw_z[i],
                zscore,
                iqr_score: iqr_scores[i],
                mad_score: mad_scores[i],
                combined,
                votes,
                direction: AnomalyDirection::None,
            }
        })
        .collect();

    // Provisional pass at the base threshold to measure the skew.
    let mut up = 0usize;
    let mut down = 0usize;
    for s in &scores {
        if s.combined > config.threshold && s.votes >= config.min_votes {
            if s.raw_zscore > 0.0 {
                up += 1;
            } else if s.raw_zscore < 0.0 {
                down += 1;
            }
        }
    }

    let (threshold_up, threshold_down) = match config.rebalance {
        RebalancePolicy::Disabled => (config.threshold, config.threshold),
        RebalancePolicy::RelaxMinority { factor, ratio } => {
            if up as f64 > down as f64 * ratio && down > 0 {
                warn!(
                    up,
                    down, "rising anomalies dominate; relaxing the falling threshold"
                );
                (config.threshold, config.threshold * factor)
            } else if down as f64 > up as f64 * ratio && up > 0 {
                warn!(
                    up,
                    down, "falling anomalies dominate; relaxing the rising threshold"
                );
                (config.threshold * factor, config.threshold)
            } else {
                (config.threshold, config.threshold)
            }
        }
    };

    let markers: Vec<bool> = scores
        .iter_mut()
        .map(|s| {
            if s.votes < config.min_votes {
                return false;
            }
            if s.raw_zscore > 0.0 && s.combined > threshold_up {
                s.direction = AnomalyDirection::Up;
                true
            } else if s.raw_zscore < 0.0 && s.combined > threshold_down {
                s.direction = AnomalyDirection::Down;
                true
            } else {
                false
            }
        })
        .collect();

    ScoreOutcome {
        scores,
        threshold_up,
        threshold_down,
        markers,
    }
}
