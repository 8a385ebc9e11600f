//! Spike detection: isolated rise-then-fall shapes against a local
//! moving baseline, independent of the statistical scorer.

use tracing::debug;

use crate::stats::centered_moving_average;

/// Configuration for the spike detector.
#[derive(Debug, Clone, Copy)]
pub struct SpikeConfig {
    /// Minimum count of valid (finite, non-zero) values.
    pub min_valid: usize,
    /// Maximum allowed distance, in buckets, to each valid neighbor.
    /// Guards against "spikes" that are artifacts of sparse data.
    pub max_neighbor_gap: usize,
    /// Minimum mean prominence ratio for a candidate to qualify.
    pub prominence_threshold: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            min_valid: 5,
            max_neighbor_gap: 7,
            prominence_threshold: 0.3,
        }
    }
}

/// Spike verdict for one point.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpikeInfo {
    pub is_spike: bool,
    /// Mean of the three prominence ratios (vs baseline, previous, next).
    pub prominence: f64,
}

/// Detect spikes in a value series.
///
/// Zero values are treated as invalid: they are gap fill in an aggregated
/// series, and a real value surrounded by fill is not a spike shape.
pub fn detect_spikes(values: &[f64], config: &SpikeConfig) -> Vec<SpikeInfo> {
    let n = values.len();
    let mut result = vec![SpikeInfo::default(); n];

    let valid_indices: Vec<usize> = (0..n)
        .filter(|&i| values[i].is_finite() && values[i] != 0.0)
        .collect();
    let n_valid = valid_indices.len();
    if n_valid < config.min_valid {
        debug!(n_valid, "too few valid points for spike detection");
        return result;
    }

    let valid_values: Vec<f64> = valid_indices.iter().map(|&i| values[i]).collect();
    let window = (n_valid / 20).clamp(3, 7);
    if n_valid <= window * 2 {
        return result;
    }

    let baseline = centered_moving_average(&valid_values, window);

    let mut spikes = 0usize;
    for i in window..(n_valid - window) {
        let prev_gap = valid_indices[i] - valid_indices[i - 1];
        let next_gap = valid_indices[i + 1] - valid_indices[i];
        if prev_gap > config.max_neighbor_gap || next_gap > config.max_neighbor_gap {
            continue;
        }

        let value = valid_values[i];
        let prev = valid_values[i - 1];
        let next = valid_values[i + 1];
        if value <= prev || value <= next {
            continue;
        }

        let ratio = |reference: f64| {
            let denom = if reference > 0.0 { reference } else { 1.0 };
            (value - reference) / denom
        };
        let prominence = (ratio(baseline[i]) + ratio(prev) + ratio(next)) / 3.0;

        if prominence > config.prominence_threshold {
            result[valid_indices[i]] = SpikeInfo {
                is_spike: true,
                prominence,
            };
            spikes += 1;
        }
    }
    debug!(spikes, n_valid, window, "spike detection complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_isolated_spike_is_detected() {
        let mut values = vec![100.0; 30];
        values[15] = 400.0;

        let spikes = detect_spikes(&values, &SpikeConfig::default());
        assert!(spikes[15].is_spike);
        assert!(spikes[15].prominence > 0.3);
        assert_eq!(spikes.iter().filter(|s| s.is_spike).count(), 1);
    }

    #[test]
    fn flat_series_has_no_spikes() {
        let spikes = detect_spikes(&[100.0; 30], &SpikeConfig::default());
        assert!(spikes.iter().all(|s| !s.is_spike));
    }

    #[test]
    fn plateau_is_not_a_spike() {
        // Rise to a sustained level, no fall: not a rise-then-fall shape.
        let mut values = vec![100.0; 30];
        for v in values.iter_mut().skip(15) {
            *v = 400.0;
        }
        let spikes = detect_spikes(&values, &SpikeConfig::default());
        assert!(spikes.iter().all(|s| !s.is_spike));
    }

    #[test]
    fn mild_local_max_below_prominence_threshold_is_skipped() {
        let mut values = vec![100.0; 30];
        values[15] = 110.0;
        let spikes = detect_spikes(&values, &SpikeConfig::default());
        assert!(!spikes[15].is_spike);
    }

    #[test]
    fn too_few_valid_values_disables_detection() {
        let values = vec![0.0, 0.0, 100.0, 500.0, 100.0, 0.0, 0.0];
        let spikes = detect_spikes(&values, &SpikeConfig::default());
        assert!(spikes.iter().all(|s| !s.is_spike));
    }

    #[test]
    fn sparse_neighbors_beyond_gap_limit_are_rejected() {
        // A peak whose valid neighbors sit 8 buckets away (zero fill
        // between): enough valid points overall, but the gap guard trips.
        let mut values = vec![0.0; 96];
        for i in (0..96).step_by(8) {
            values[i] = 100.0;
        }
        values[40] = 400.0;
        let spikes = detect_spikes(&values, &SpikeConfig::default());
        assert!(!spikes[40].is_spike);
    }

    #[test]
    fn dense_series_detects_embedded_spike() {
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 + (i % 3) as f64).collect();
        values[20] = 350.0;
        let spikes = detect_spikes(&values, &SpikeConfig::default());
        assert!(spikes[20].is_spike);
    }
}
