//! Shared statistical helpers for scoring and correlation.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the sample variance (n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Calculate a percentile (0-100) with linear interpolation between ranks.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

/// Median absolute deviation from the median (unscaled).
pub fn mad(values: &[f64]) -> f64 {
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|x| (x - med).abs()).collect();
    median(&deviations)
}

/// Pearson correlation coefficient between two equal-length slices.
///
/// Returns `None` when either side is degenerate (constant or too short).
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        cov += (a - mx) * (b - my);
        var_x += (a - mx).powi(2);
        var_y += (b - my).powi(2);
    }
    if var_x < 1e-12 || var_y < 1e-12 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Spearman rank correlation (Pearson over fractional ranks).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    pearson(&ranks(x), &ranks(y))
}

/// Fractional ranks with ties averaged.
fn ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut result = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Average rank for the tie group (1-based ranks).
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            result[idx] = avg_rank;
        }
        i = j + 1;
    }
    result
}

/// Centered moving average matching a `same`-mode convolution with a
/// uniform kernel: positions past the edges contribute zero, so boundary
/// values are biased toward zero.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || window == 0 {
        return vec![];
    }
    let half_left = (window - 1) / 2;
    let half_right = window / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half_left);
            let end = (i + half_right + 1).min(n);
            values[start..end].iter().sum::<f64>() / window as f64
        })
        .collect()
}

/// Centered rolling mean that yields `None` wherever the full window does
/// not fit (pandas `rolling(center=True)` behavior, used for trend lines).
pub fn rolling_mean_centered(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if window == 0 || window > n {
        return vec![None; n];
    }
    let half_left = (window - 1) / 2;
    (0..n)
        .map(|i| {
            if i < half_left || i + (window - half_left) > n {
                None
            } else {
                let start = i - half_left;
                Some(values[start..start + window].iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_std_of_simple_series() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0, epsilon = 1e-10);
        assert_relative_eq!(std_dev(&values), 2.138_089_935, epsilon = 1e-6);
    }

    #[test]
    fn median_even_and_odd_lengths() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5, epsilon = 1e-10);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        assert_relative_eq!(percentile(&values, 25.0), 2.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 50.0), 3.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 75.0), 4.0, epsilon = 1e-10);
        // Interpolated value between the 1st and 2nd entries.
        assert_relative_eq!(percentile(&values, 10.0), 1.4, epsilon = 1e-10);
    }

    #[test]
    fn mad_of_constant_series_is_zero() {
        assert_relative_eq!(mad(&[5.0; 10]), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn pearson_detects_perfect_linear_relation() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-10);

        let y_neg: Vec<f64> = x.iter().map(|v| -2.0 * v).collect();
        assert_relative_eq!(pearson(&x, &y_neg).unwrap(), -1.0, epsilon = 1e-10);
    }

    #[test]
    fn pearson_rejects_constant_input() {
        let x = vec![1.0; 5];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(pearson(&x, &y).is_none());
    }

    #[test]
    fn spearman_captures_monotone_nonlinear_relation() {
        let x: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v.exp()).collect();
        assert_relative_eq!(spearman(&x, &y).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn ranks_average_ties() {
        let r = ranks(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(r, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn centered_moving_average_preserves_length() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = centered_moving_average(&values, 3);
        assert_eq!(smoothed.len(), 5);
        assert_relative_eq!(smoothed[2], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn rolling_mean_centered_leaves_edges_undefined() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let rolled = rolling_mean_centered(&values, 3);
        assert!(rolled[0].is_none());
        assert_relative_eq!(rolled[1].unwrap(), 2.0, epsilon = 1e-10);
        assert_relative_eq!(rolled[3].unwrap(), 4.0, epsilon = 1e-10);
        assert!(rolled[4].is_none());
    }
}
