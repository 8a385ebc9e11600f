//! Sliding-window detection of temporally clustered anomalies.
//!
//! A run of anomalies inside a short window points at a systemic shift
//! rather than one-off noise; the continuity strength feeds both the
//! selector's ranking and the explanation text.

/// Configuration for the streak detector.
#[derive(Debug, Clone, Copy)]
pub struct StreakConfig {
    /// Sliding window length.
    pub window_size: usize,
    /// Minimum anomalous marks inside a window for it to qualify.
    pub min_anomalies: usize,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            window_size: 3,
            min_anomalies: 2,
        }
    }
}

/// Continuity strength for one point.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakInfo {
    /// `count / window_size` of the strongest qualifying window covering
    /// this point; 0 outside any streak.
    pub consecutive_score: f64,
    pub in_streak: bool,
}

/// Detect streaks over an ordered anomaly-marker sequence.
///
/// Only points that are themselves anomalous receive a score; overlapping
/// windows keep the maximum, not the sum.
pub fn detect_streaks(markers: &[bool], config: &StreakConfig) -> Vec<StreakInfo> {
    let n = markers.len();
    let mut result = vec![StreakInfo::default(); n];
    if n < config.window_size || config.window_size == 0 {
        return result;
    }

    for start in 0..=(n - config.window_size) {
        let window = &markers[start..start + config.window_size];
        let count = window.iter().filter(|m| **m).count();
        if count < config.min_anomalies {
            continue;
        }
        let score = count as f64 / config.window_size as f64;
        for (offset, is_anomaly) in window.iter().enumerate() {
            if *is_anomaly {
                let info = &mut result[start + offset];
                info.consecutive_score = info.consecutive_score.max(score);
                info.in_streak = true;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn isolated_anomaly_gets_no_streak() {
        let markers = vec![false, false, true, false, false];
        let streaks = detect_streaks(&markers, &StreakConfig::default());
        assert!(streaks.iter().all(|s| !s.in_streak));
        assert!(streaks.iter().all(|s| s.consecutive_score == 0.0));
    }

    #[test]
    fn two_of_three_in_window_scores_two_thirds() {
        let markers = vec![false, true, true, false, false];
        let streaks = detect_streaks(&markers, &StreakConfig::default());
        assert!(streaks[1].in_streak);
        assert!(streaks[2].in_streak);
        assert_relative_eq!(streaks[1].consecutive_score, 2.0 / 3.0, epsilon = 1e-12);
        // Non-anomalous neighbors stay untouched even inside the window.
        assert!(!streaks[0].in_streak);
        assert!(!streaks[3].in_streak);
    }

    #[test]
    fn full_window_scores_one() {
        let markers = vec![true, true, true];
        let streaks = detect_streaks(&markers, &StreakConfig::default());
        for s in &streaks {
            assert_relative_eq!(s.consecutive_score, 1.0, epsilon = 1e-12);
            assert!(s.in_streak);
        }
    }

    #[test]
    fn overlapping_windows_take_the_maximum() {
        // Point 2 sits in a 3/3 window and a 2/3 window; it keeps 1.0.
        let markers = vec![true, true, true, false, true];
        let streaks = detect_streaks(&markers, &StreakConfig::default());
        assert_relative_eq!(streaks[2].consecutive_score, 1.0, epsilon = 1e-12);
        assert_relative_eq!(streaks[4].consecutive_score, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn short_series_yields_no_streaks() {
        let markers = vec![true, true];
        let streaks = detect_streaks(&markers, &StreakConfig::default());
        assert!(streaks.iter().all(|s| !s.in_streak));
    }

    #[test]
    fn streak_score_implies_anomalous_membership() {
        let markers = vec![true, false, true, true, false, true, false, false, true, true];
        let streaks = detect_streaks(&markers, &StreakConfig::default());
        for (marker, streak) in markers.iter().zip(streaks.iter()) {
            if streak.consecutive_score > 0.0 {
                assert!(*marker, "non-anomalous point carries a streak score");
            }
        }
    }
}
