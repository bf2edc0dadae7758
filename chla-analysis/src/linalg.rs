//! Least-squares solves shared by the smoothers, the curve fitter and the
//! trend regression, on top of nalgebra's SVD.

use nalgebra::{DMatrix, DVector};

/// Singular values below this fraction of the largest mark a rank-deficient design.
const RANK_TOLERANCE: f64 = 1e-12;

/// Coefficients `c` minimising `|design · c - y|`, one design row per sample.
///
/// Returns `None` when the rows are ragged, there are fewer rows than
/// columns or the design is rank deficient.
pub(crate) fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let cols = design.first()?.len();
    if cols == 0 || design.len() != y.len() || design.len() < cols || design.iter().any(|r| r.len() != cols) {
        return None;
    }
    let a = DMatrix::from_fn(design.len(), cols, |i, j| design[i][j]);
    let svd = a.svd(true, true);
    let largest = svd.singular_values.max();
    if !(largest > 0.0 && largest.is_finite()) || svd.singular_values.min() <= largest * RANK_TOLERANCE {
        return None;
    }
    let solution = svd
        .solve(&DVector::from_column_slice(y), largest * RANK_TOLERANCE)
        .ok()?;
    solution
        .iter()
        .all(|v| v.is_finite())
        .then(|| solution.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_squares_line() {
        let design: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
        let y: Vec<f64> = (0..5).map(|x| 3.0 + 2.0 * x as f64).collect();
        let c = least_squares(&design, &y).unwrap();
        assert!((c[0] - 3.0).abs() < 1e-10);
        assert!((c[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_least_squares_overdetermined_noise() {
        // residuals +1, -1, -1, +1 around y = x cancel out
        let design: Vec<Vec<f64>> = (0..4).map(|x| vec![x as f64, 1.0]).collect();
        let y = [1.0, 0.0, 1.0, 4.0];
        let c = least_squares(&design, &y).unwrap();
        assert!((c[0] - 1.0).abs() < 1e-10);
        assert!(c[1].abs() < 1e-10);
    }

    #[test]
    fn test_rank_deficient_design() {
        let design = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        assert!(least_squares(&design, &[1.0, 2.0, 3.0]).is_none());
        assert!(least_squares(&[vec![1.0, 2.0]], &[1.0]).is_none());
        assert!(least_squares(&[], &[]).is_none());
    }
}
