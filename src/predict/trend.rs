//! Linear trend of a forecast

use serde::{Deserialize, Serialize};

use crate::Trend;

/// Ordinary least-squares fit of `value ~ index`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation between index and value
    pub r_value: f64,
    pub trend: Trend,
}

/// Fit a line through `(i, values[i])` for `i` in `0..values.len()`.
///
/// Fewer than two points, or a constant series, give a zero slope.
pub fn fit_trend(values: &[f64]) -> TrendFit {
    let n = values.len();
    if n == 0 {
        return TrendFit {
            slope: 0.0,
            intercept: 0.0,
            r_value: 0.0,
            trend: Trend::from_slope(0.0),
        };
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n as f64;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;
    let r_value = if sxx > 0.0 && syy > 0.0 {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    TrendFit {
        slope,
        intercept,
        r_value,
        trend: Trend::from_slope(slope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let values: Vec<f64> = (0..90).map(|i| 3.0 + 0.5 * i as f64).collect();
        let fit = fit_trend(&values);

        assert!((fit.slope - 0.5).abs() < 1e-12);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
        assert!((fit.r_value - 1.0).abs() < 1e-12);
        assert_eq!(fit.trend, Trend::Positive);
    }

    #[test]
    fn test_strictly_increasing_is_positive() {
        let values = [1.0, 1.1, 5.0, 5.01, 80.0];
        assert_eq!(fit_trend(&values).trend, Trend::Positive);
    }

    #[test]
    fn test_strictly_decreasing_is_negative() {
        let values = [9.0, 4.0, 3.9, -2.0, -50.0];
        let fit = fit_trend(&values);

        assert!(fit.slope < 0.0);
        assert_eq!(fit.trend, Trend::Negative);
    }

    #[test]
    fn test_flat_series_is_negative() {
        let fit = fit_trend(&[4.0; 10]);

        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 4.0);
        assert_eq!(fit.r_value, 0.0);
        assert_eq!(fit.trend, Trend::Negative);
    }

    #[test]
    fn test_degenerate_lengths() {
        assert_eq!(fit_trend(&[]).slope, 0.0);

        let single = fit_trend(&[12.5]);
        assert_eq!(single.slope, 0.0);
        assert_eq!(single.intercept, 12.5);
    }
}
