//! Phenology, trend and curve-fitting analysis for Chl-a series.
//!
//! Every component takes the immutable [`config::AnalysisConfig`] by
//! reference and is a pure function of its inputs.

pub mod config;
pub mod fit;
mod linalg;
pub mod phenology;
pub mod spatial;
pub mod trend;

pub use config::AnalysisConfig;

/// Linear interpolation onto a daily grid.
pub mod interpolation {
    /// Interpolate `(day, value)` points onto every day of `[start, end]`.
    ///
    /// Points must be sorted by day with no duplicate days. Days before the
    /// first point or after the last one take the nearest observed value.
    /// Returns `None` when there are no points.
    pub fn daily_grid(points: &[(f64, f64)], start: u16, end: u16) -> Option<Vec<f64>> {
        let (first, last) = (points.first()?, points.last()?);
        let grid = (start..=end)
            .map(|day| {
                let x = (day as f64).clamp(first.0, last.0);
                // index of the first point at or after x
                let upper = points.partition_point(|p| p.0 < x);
                if upper == 0 {
                    return first.1;
                }
                if upper >= points.len() {
                    return last.1;
                }
                let (x0, y0) = points[upper - 1];
                let (x1, y1) = points[upper];
                if x1 == x0 {
                    return y1;
                }
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            })
            .collect();
        Some(grid)
    }

}

/// Moving-window smoothers. Both are linear in their input.
pub mod smoothing {
    use crate::linalg;

    /// Centered rolling mean with partial windows at the edges.
    ///
    /// Day `i` averages `[i - w/2, i + (w - 1)/2]` clipped to the series.
    /// A window of 0 or 1 returns the input.
    pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
        if window <= 1 {
            return values.to_vec();
        }
        let before = window / 2;
        let after = (window - 1) / 2;
        (0..values.len())
            .map(|i| {
                let lo = i.saturating_sub(before);
                let hi = (i + after).min(values.len() - 1);
                let slice = &values[lo..=hi];
                slice.iter().sum::<f64>() / slice.len() as f64
            })
            .collect()
    }

    /// Savitzky-Golay filter.
    ///
    /// Interior points use the least-squares convolution weights; the first
    /// and last `window / 2` points are evaluated on the polynomial fitted to
    /// the boundary window. A series shorter than `window` uses the largest
    /// odd window that fits. When the window is not larger than `order` the
    /// input is returned unchanged.
    pub fn savitzky_golay(values: &[f64], window: usize, order: usize) -> Vec<f64> {
        let mut window = window.min(values.len());
        if window % 2 == 0 {
            window = window.saturating_sub(1);
        }
        if window <= order || window < 3 {
            return values.to_vec();
        }
        let half = window / 2;
        // offsets scaled to [-1, 1] keep the normal equations well conditioned
        let offsets: Vec<f64> = (0..window)
            .map(|i| (i as f64 - half as f64) / half as f64)
            .collect();
        let Some(weights) = center_weights(&offsets, order) else {
            return values.to_vec();
        };

        let n = values.len();
        let mut out = vec![0.0; n];
        for i in half..n - half {
            out[i] = weights
                .iter()
                .zip(&values[i - half..=i + half])
                .map(|(w, v)| w * v)
                .sum();
        }

        let head = polyfit(&offsets, &values[..window], order);
        let tail = polyfit(&offsets, &values[n - window..], order);
        match (head, tail) {
            (Some(head), Some(tail)) => {
                for i in 0..half {
                    out[i] = polyval(&head, offsets[i]);
                    out[n - half + i] = polyval(&tail, offsets[half + 1 + i]);
                }
                out
            }
            _ => values.to_vec(),
        }
    }

    /// Weights whose dot product with a window gives the fitted value at offset 0.
    fn center_weights(offsets: &[f64], order: usize) -> Option<Vec<f64>> {
        // Fitting a unit impulse at each position gives that position's weight.
        (0..offsets.len())
            .map(|k| {
                let impulse: Vec<f64> = (0..offsets.len())
                    .map(|i| if i == k { 1.0 } else { 0.0 })
                    .collect();
                polyfit(offsets, &impulse, order).map(|c| c[0])
            })
            .collect()
    }

    fn polyfit(xs: &[f64], ys: &[f64], order: usize) -> Option<Vec<f64>> {
        let design: Vec<Vec<f64>> = xs
            .iter()
            .map(|x| (0..=order).map(|p| x.powi(p as i32)).collect())
            .collect();
        linalg::least_squares(&design, ys)
    }

    fn polyval(coefficients: &[f64], x: f64) -> f64 {
        coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn assert_close(a: &[f64], b: &[f64]) {
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b) {
                assert!((x - y).abs() < 1e-7, "{a:?} != {b:?}");
            }
        }

        #[test]
        fn test_rolling_mean_partial_windows() {
            let values = [1.0, 2.0, 3.0, 4.0, 5.0];
            // window 3: [0,1] [0,2] [1,3] [2,4] [3,4]
            assert_close(&rolling_mean(&values, 3), &[1.5, 2.0, 3.0, 4.0, 4.5]);
            // window 4: [i-2, i+1]
            assert_close(&rolling_mean(&values, 4), &[1.5, 2.0, 2.5, 3.5, 4.0]);
            assert_close(&rolling_mean(&values, 1), &values);
        }

        #[test]
        fn test_savgol_preserves_cubic() {
            let values: Vec<f64> = (0..30)
                .map(|i| {
                    let x = i as f64;
                    0.01 * x.powi(3) - 0.3 * x * x + 2.0 * x + 5.0
                })
                .collect();
            assert_close(&savitzky_golay(&values, 15, 3), &values);
        }

        #[test]
        fn test_savgol_smooths_spike() {
            let mut values = vec![1.0; 21];
            values[10] = 11.0;
            let smoothed = savitzky_golay(&values, 15, 3);
            assert!(smoothed[10] < 11.0);
            assert!(smoothed[10] > 1.0);
            // the spike sits in the middle, so the response is symmetric
            assert!((smoothed[9] - smoothed[11]).abs() < 1e-9);
            assert!((smoothed[0] - smoothed[20]).abs() < 1e-9);
        }

        #[test]
        fn test_savgol_short_series() {
            let values = [1.0, 4.0, 2.0];
            assert_close(&savitzky_golay(&values, 15, 3), &values);
            let linear = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
            assert_close(&savitzky_golay(&linear, 15, 3), &linear);
        }
    }
}
