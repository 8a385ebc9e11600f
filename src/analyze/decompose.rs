//! Moving-average trend/seasonal/residual decomposition.
//!
//! A deliberately simple decomposition: centered rolling mean for trend,
//! period-modulo group means for seasonality, residual as the remainder.
//! Edges where the centered window does not fit stay undefined.

use crate::core::Decomposition;
use crate::stats::rolling_mean_centered;

/// Minimum series length for attempting a decomposition.
pub const MIN_DECOMPOSE_LEN: usize = 7;

/// Decompose a series, or return `None` when the series is too short or
/// degenerate. Failure here never fails the surrounding analysis.
pub fn decompose(values: &[f64]) -> Option<Decomposition> {
    let n = values.len();
    if n < MIN_DECOMPOSE_LEN {
        return None;
    }

    // Yearly-style period for long series, half the length otherwise.
    let period = if n > 12 { 12 } else { n / 2 };
    if period < 2 {
        return None;
    }

    let trend = rolling_mean_centered(values, period);
    if trend.iter().all(|t| t.is_none()) {
        return None;
    }

    // Seasonal component: mean detrended value per position in the period.
    let mut group_sums = vec![0.0; period];
    let mut group_counts = vec![0usize; period];
    for (i, (value, trend_val)) in values.iter().zip(trend.iter()).enumerate() {
        if let Some(t) = trend_val {
            group_sums[i % period] += value - t;
            group_counts[i % period] += 1;
        }
    }
    let group_means: Vec<f64> = group_sums
        .iter()
        .zip(group_counts.iter())
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
        .collect();

    let seasonal: Vec<f64> = (0..n).map(|i| group_means[i % period]).collect();

    let residual: Vec<Option<f64>> = values
        .iter()
        .zip(trend.iter())
        .zip(seasonal.iter())
        .map(|((value, trend_val), s)| trend_val.map(|t| value - t - s))
        .collect();

    Some(Decomposition {
        period,
        trend,
        seasonal,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn short_series_is_not_decomposed() {
        assert!(decompose(&[1.0; 6]).is_none());
        assert!(decompose(&[]).is_none());
    }

    #[test]
    fn constant_series_has_flat_trend_and_no_seasonality() {
        let values = vec![100.0; 30];
        let result = decompose(&values).unwrap();

        assert_eq!(result.period, 12);
        for t in result.trend.iter().flatten() {
            assert_relative_eq!(*t, 100.0, epsilon = 1e-9);
        }
        for s in &result.seasonal {
            assert_relative_eq!(*s, 0.0, epsilon = 1e-9);
        }
        for r in result.residual.iter().flatten() {
            assert_relative_eq!(*r, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn components_sum_back_to_the_series() {
        let values: Vec<f64> = (0..40)
            .map(|i| 50.0 + i as f64 + 10.0 * ((i % 12) as f64))
            .collect();
        let result = decompose(&values).unwrap();

        for i in 0..values.len() {
            if let (Some(t), Some(r)) = (result.trend[i], result.residual[i]) {
                assert_relative_eq!(t + result.seasonal[i] + r, values[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn seasonal_pattern_is_recovered() {
        // Strong alternating pattern with period 12 visible in the means.
        let values: Vec<f64> = (0..48)
            .map(|i| if i % 12 == 0 { 200.0 } else { 100.0 })
            .collect();
        let result = decompose(&values).unwrap();

        // The position that carries the peak gets a clearly higher
        // seasonal component than the rest.
        assert!(result.seasonal[12] > result.seasonal[13] + 50.0);
    }

    #[test]
    fn trend_edges_are_undefined() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let result = decompose(&values).unwrap();
        assert!(result.trend[0].is_none());
        assert!(result.trend.last().unwrap().is_none());
        assert!(result.trend[10].is_some());
    }
}
