//! Principal component scores from a symmetric eigen-decomposition.
//!
//! For a centred (stimulus × feature) matrix X the decomposition runs on
//! whichever of X·Xᵀ (stimulus side) or Xᵀ·X (feature side) is smaller.
//! Component signs are fixed so the score with the largest magnitude is
//! positive.

use std::cmp::Ordering;

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{AnalysisError, Result};

/// Leading `k` eigenpairs of a symmetric positive semi-definite matrix,
/// largest eigenvalue first.
fn top_eigenpairs(a: &Array2<f64>, k: usize) -> Vec<(f64, Array1<f64>)> {
    let n = a.nrows();
    let eigen = SymmetricEigen::new(DMatrix::from_fn(n, n, |i, j| a[[i, j]]));
    let mut order: Vec<(usize, f64)> = eigen.eigenvalues.iter().copied().enumerate().collect();
    order.sort_by(|x, y| y.1.partial_cmp(&x.1).unwrap_or(Ordering::Equal));
    order
        .into_iter()
        .take(k)
        .map(|(idx, lambda)| {
            let v = Array1::from_iter(eigen.eigenvectors.column(idx).iter().copied());
            (lambda.max(0.0), v)
        })
        .collect()
}

/// Scores of the rows of `m` on its first `k` principal components:
/// [row, component].
pub fn pca_scores(m: ArrayView2<f64>, k: usize) -> Result<Array2<f64>> {
    let (n, p) = m.dim();
    if k == 0 || k > n.min(p) {
        return Err(AnalysisError::InvalidParameter(format!(
            "n_components must be in 1..={} for a {n}×{p} matrix, got {k}",
            n.min(p)
        )));
    }

    let mean = m
        .mean_axis(Axis(0))
        .ok_or_else(|| AnalysisError::EmptyInput("no rows".into()))?;
    let centred = &m - &mean;

    let mut scores = Array2::zeros((n, k));
    if n <= p {
        let gram = centred.dot(&centred.t());
        for (j, (lambda, u)) in top_eigenpairs(&gram, k).into_iter().enumerate() {
            scores.column_mut(j).assign(&(u * lambda.sqrt()));
        }
    } else {
        let cov = centred.t().dot(&centred);
        for (j, (_, v)) in top_eigenpairs(&cov, k).into_iter().enumerate() {
            scores.column_mut(j).assign(&centred.dot(&v));
        }
    }

    for mut col in scores.columns_mut() {
        let peak = col
            .iter()
            .copied()
            .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if peak < 0.0 {
            col.mapv_inplace(|x| -x);
        }
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_recovers_line() {
        // points on the line y = 2x
        let m = array![[0.0, 0.0], [1.0, 2.0], [2.0, 4.0], [6.0, 12.0]];
        let scores = pca_scores(m.view(), 1).unwrap();
        let expected: Vec<f64> = [0.0, 1.0, 2.0, 6.0]
            .iter()
            .map(|t| (t - 2.25) * 5f64.sqrt())
            .collect();
        for (got, want) in scores.column(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-8, "{got} vs {want}");
        }
    }

    #[test]
    fn test_pca_scores_centred_both_sides() {
        let wide = array![
            [1.0, 0.0, 3.0, 2.0, 5.0],
            [4.0, 1.0, 0.0, 2.0, 1.0],
            [0.0, 2.0, 2.0, 7.0, 1.0]
        ];
        let tall = wide.t().to_owned();
        for m in [wide, tall] {
            let scores = pca_scores(m.view(), 2).unwrap();
            for col in scores.columns() {
                assert!(col.sum().abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_pca_variance_ordering() {
        let m = array![
            [10.0, 0.1, 0.0],
            [-10.0, -0.1, 0.2],
            [5.0, 0.3, -0.1],
            [-5.0, -0.2, 0.0]
        ];
        let scores = pca_scores(m.view(), 2).unwrap();
        let var = |j: usize| scores.column(j).mapv(|x| x * x).sum();
        assert!(var(0) > var(1));
    }

    #[test]
    fn test_pca_is_deterministic() {
        let m = array![[1.0, 2.0, 0.5], [0.0, 1.0, 3.0], [2.0, 2.0, 2.0], [1.5, 0.0, 1.0]];
        let a = pca_scores(m.view(), 2).unwrap();
        let b = pca_scores(m.view(), 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pca_close_eigenvalues_stay_on_axis() {
        let m = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 0.999], [0.0, -0.999]];
        let scores = pca_scores(m.view(), 1).unwrap();
        let expected = [1.0, -1.0, 0.0, 0.0];
        for (got, want) in scores.column(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }

        // same points padded with zero features: decomposed on the stimulus side
        let wide = array![
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.999, 0.0, 0.0, 0.0],
            [0.0, -0.999, 0.0, 0.0, 0.0]
        ];
        let scores = pca_scores(wide.view(), 2).unwrap();
        for (got, want) in scores.column(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
        assert!(scores[[0, 1]].abs() < 1e-9);
        assert!((scores[[2, 1]].abs() - 0.999).abs() < 1e-9);
    }

    #[test]
    fn test_pca_rejects_bad_component_count() {
        let m = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
        assert!(pca_scores(m.view(), 0).is_err());
        assert!(pca_scores(m.view(), 3).is_err());
    }
}
