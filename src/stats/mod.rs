//! Statistical Toolkit
//!
//! Pure numeric primitives shared by every analytics module: exponential
//! smoothing, Pearson correlation, autocorrelation, cosine similarity,
//! centroid computation, standard deviation, rolling windows, and
//! linear-trend estimation.
//!
//! Degenerate inputs (empty series, zero variance, oversized lags) resolve
//! to documented defaults rather than panics; the only typed failures are
//! structural ones a caller can't recover from numerically
//! (`DimensionMismatch`, `EmptyInput`).

use thiserror::Error;

/// Errors for structurally invalid statistical input
#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    /// Vectors of unequal length where equal length is required
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// An operation that needs at least one element received none
    #[error("empty input")]
    EmptyInput,
}

/// Exponential moving average of a series.
///
/// `output[0] = series[0]`, then
/// `output[i] = alpha * series[i] + (1 - alpha) * output[i - 1]`.
/// Output has the same length as the input. An empty series yields an
/// empty output. `alpha` is clamped into (0, 1].
pub fn ema(series: &[f64], alpha: f64) -> Vec<f64> {
    if series.is_empty() {
        return Vec::new();
    }

    let alpha = alpha.clamp(f64::EPSILON, 1.0);
    let mut smoothed = Vec::with_capacity(series.len());
    let mut prev = series[0];
    smoothed.push(prev);

    for &value in &series[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        smoothed.push(prev);
    }

    smoothed
}

/// Pearson correlation coefficient between two series.
///
/// Returns a value in [-1, 1]. Returns 0 when the lengths mismatch, the
/// series are empty, or either series has zero variance; degenerate input
/// is not an error here.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let n = x.len() as f64;

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

/// Normalized autocorrelation of a series at the given lag.
///
/// Lag-k autocovariance divided by the lag-0 variance. Returns 0 when
/// `lag >= series.len()`, when the series is shorter than two elements,
/// or when the series has zero variance.
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    let n = series.len();
    if lag >= n || n < 2 {
        return 0.0;
    }

    let mean = mean(series);
    let variance: f64 = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    if variance == 0.0 {
        return 0.0;
    }

    let covariance: f64 = (0..n - lag)
        .map(|i| (series[i] - mean) * (series[i + lag] - mean))
        .sum();

    (covariance / variance).clamp(-1.0, 1.0)
}

/// Cosine similarity between two vectors.
///
/// Fails with `DimensionMismatch` when lengths differ. A zero-magnitude
/// vector yields similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (mag_a * mag_b)).clamp(-1.0, 1.0))
}

/// Elementwise mean of a set of vectors.
///
/// Fails with `EmptyInput` for an empty list and `DimensionMismatch` when
/// the vectors disagree on length.
pub fn centroid(vectors: &[&[f32]]) -> Result<Vec<f32>, StatsError> {
    let first = vectors.first().ok_or(StatsError::EmptyInput)?;
    let dims = first.len();

    let mut sums = vec![0.0f64; dims];
    for vector in vectors {
        if vector.len() != dims {
            return Err(StatsError::DimensionMismatch {
                left: dims,
                right: vector.len(),
            });
        }
        for (slot, &value) in sums.iter_mut().zip(vector.iter()) {
            *slot += value as f64;
        }
    }

    let count = vectors.len() as f64;
    Ok(sums.into_iter().map(|s| (s / count) as f32).collect())
}

/// Arithmetic mean; 0 for an empty series.
pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Population standard deviation; 0 for series shorter than two elements.
pub fn std_dev(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let mean = mean(series);
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / series.len() as f64;
    variance.sqrt()
}

/// Standard deviation of each full window of `window` consecutive values.
///
/// Returns one value per window position; empty when `window` is 0 or
/// exceeds the series length.
pub fn rolling_std(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > series.len() {
        return Vec::new();
    }
    series.windows(window).map(std_dev).collect()
}

/// Least-squares slope of a series against its index.
///
/// Returns 0 for series shorter than two elements or when the index
/// variance is degenerate.
pub fn linear_trend(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = series.iter().sum();
    let sum_xy: f64 = series.iter().enumerate().map(|(i, v)| i as f64 * v).sum();
    let sum_x2: f64 = (0..n).map(|i| (i as f64).powi(2)).sum();

    let denominator = n_f * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    (n_f * sum_xy - sum_x * sum_y) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_first_element_unchanged() {
        let series = vec![3.0, 5.0, 2.0, 8.0];
        let smoothed = ema(&series, 0.3);
        assert_eq!(smoothed.len(), series.len());
        assert_eq!(smoothed[0], series[0]);
    }

    #[test]
    fn test_ema_stays_within_input_range() {
        let series = vec![-0.8, 0.8, -0.8, 0.8, -0.8, 0.8];
        let smoothed = ema(&series, 0.3);
        for value in smoothed {
            assert!(value >= -0.8 && value <= 0.8);
        }
    }

    #[test]
    fn test_ema_alpha_one_is_identity() {
        let series = vec![1.0, 2.0, 3.0];
        assert_eq!(ema(&series, 1.0), series);
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 0.3).is_empty());
    }

    #[test]
    fn test_pearson_perfect_positive() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![10.0, 8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&x, &y) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pearson_symmetric() {
        let x = vec![1.0, 3.0, 2.0, 5.0, 4.0];
        let y = vec![2.0, 1.0, 4.0, 3.0, 5.0];
        assert!((pearson(&x, &y) - pearson(&y, &x)).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_constant_input_is_zero() {
        let x = vec![4.0, 4.0, 4.0, 4.0];
        let y = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn test_pearson_length_mismatch_is_zero() {
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_autocorrelation_period_two() {
        // Perfectly alternating series: lag 2 correlates, lag 1 anti-correlates.
        let series = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        assert!(autocorrelation(&series, 2) > 0.5);
        assert!(autocorrelation(&series, 1) < -0.5);
    }

    #[test]
    fn test_autocorrelation_lag_beyond_length_is_zero() {
        let series = vec![1.0, 2.0, 3.0];
        assert_eq!(autocorrelation(&series, 3), 0.0);
        assert_eq!(autocorrelation(&series, 10), 0.0);
    }

    #[test]
    fn test_autocorrelation_constant_is_zero() {
        let series = vec![2.0; 10];
        assert_eq!(autocorrelation(&series, 2), 0.0);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.3, 0.5, 0.1];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0, 0.5];
        assert_eq!(
            cosine_similarity(&a, &b),
            Err(StatsError::DimensionMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_centroid_of_equal_vectors() {
        let v = vec![1.0f32, 2.0, 3.0];
        let vectors: Vec<&[f32]> = vec![&v, &v, &v];
        assert_eq!(centroid(&vectors).unwrap(), v);
    }

    #[test]
    fn test_centroid_empty_input() {
        let vectors: Vec<&[f32]> = Vec::new();
        assert_eq!(centroid(&vectors), Err(StatsError::EmptyInput));
    }

    #[test]
    fn test_centroid_averages() {
        let a = vec![0.0f32, 2.0];
        let b = vec![2.0f32, 4.0];
        let vectors: Vec<&[f32]> = vec![&a, &b];
        assert_eq!(centroid(&vectors).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_std_dev_population() {
        // Population std dev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2.
        let series = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&series) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_std_dev_short_series() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
    }

    #[test]
    fn test_rolling_std_window_count() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let windows = rolling_std(&series, 3);
        assert_eq!(windows.len(), 3);
    }

    #[test]
    fn test_rolling_std_oversized_window() {
        assert!(rolling_std(&[1.0, 2.0], 3).is_empty());
        assert!(rolling_std(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_linear_trend_positive() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((linear_trend(&series) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_trend_flat() {
        let series = vec![3.0, 3.0, 3.0];
        assert_eq!(linear_trend(&series), 0.0);
    }

    #[test]
    fn test_linear_trend_short_series() {
        assert_eq!(linear_trend(&[1.0]), 0.0);
        assert_eq!(linear_trend(&[]), 0.0);
    }
}
