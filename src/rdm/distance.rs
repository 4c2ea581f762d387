//! Pairwise distances between the rows of a matrix.
//!
//! `pdist` returns the condensed form: the strictly upper-triangular part of
//! the square distance matrix, row-major, i.e. pairs
//! (0,1), (0,2), …, (0,n−1), (1,2), … .

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::config::condensed_len;
use crate::error::{AnalysisError, Result};

/// Supported distance metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    SqEuclidean,
    Cityblock,
    Chebyshev,
    /// 1 − cosine similarity.
    Cosine,
    /// 1 − Pearson correlation.
    Correlation,
    Canberra,
    BrayCurtis,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Euclidean,
        Metric::SqEuclidean,
        Metric::Cityblock,
        Metric::Chebyshev,
        Metric::Cosine,
        Metric::Correlation,
        Metric::Canberra,
        Metric::BrayCurtis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::SqEuclidean => "sqeuclidean",
            Metric::Cityblock => "cityblock",
            Metric::Chebyshev => "chebyshev",
            Metric::Cosine => "cosine",
            Metric::Correlation => "correlation",
            Metric::Canberra => "canberra",
            Metric::BrayCurtis => "braycurtis",
        }
    }

    /// Distance between two equal-length vectors.
    pub fn distance(&self, u: ArrayView1<f64>, v: ArrayView1<f64>) -> f64 {
        debug_assert_eq!(u.len(), v.len());
        let pairs = u.iter().zip(v.iter());
        match self {
            Metric::Euclidean => sq_euclidean(u, v).sqrt(),
            Metric::SqEuclidean => sq_euclidean(u, v),
            Metric::Cityblock => pairs.map(|(a, b)| (a - b).abs()).sum(),
            Metric::Chebyshev => pairs.map(|(a, b)| (a - b).abs()).fold(0.0, f64::max),
            Metric::Cosine => cosine_distance(u, v),
            Metric::Correlation => {
                let uc = &u - u.mean().unwrap_or(0.0);
                let vc = &v - v.mean().unwrap_or(0.0);
                cosine_distance(uc.view(), vc.view())
            }
            Metric::Canberra => pairs
                .map(|(a, b)| {
                    let denom = a.abs() + b.abs();
                    if denom > 0.0 {
                        (a - b).abs() / denom
                    } else {
                        0.0
                    }
                })
                .sum(),
            Metric::BrayCurtis => {
                let (num, denom) = pairs.fold((0.0, 0.0), |(n, d), (a, b)| {
                    (n + (a - b).abs(), d + (a + b).abs())
                });
                // 0/0 stays undefined
                num / denom
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| AnalysisError::UnsupportedMetric(s.to_string()))
    }
}

fn sq_euclidean(u: ArrayView1<f64>, v: ArrayView1<f64>) -> f64 {
    u.iter().zip(v.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// 1 − u·v / (‖u‖‖v‖). Undefined (NaN) when either vector is all zeros.
fn cosine_distance(u: ArrayView1<f64>, v: ArrayView1<f64>) -> f64 {
    let dot = u.dot(&v);
    let norm = (u.dot(&u) * v.dot(&v)).sqrt();
    if norm > 0.0 {
        // rounding can push the ratio just past ±1
        (1.0 - dot / norm).max(0.0)
    } else {
        f64::NAN
    }
}

/// Condensed pairwise distances between the rows of `x`.
pub fn pdist(x: ArrayView2<f64>, metric: Metric) -> Array1<f64> {
    let n = x.nrows();
    let mut out = Vec::with_capacity(condensed_len(n));
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(metric.distance(x.row(i), x.row(j)));
        }
    }
    Array1::from_vec(out)
}

/// Expand a condensed vector into the symmetric square matrix with zero
/// diagonal.
pub fn squareform(condensed: ArrayView1<f64>) -> Result<Array2<f64>> {
    let len = condensed.len();
    // smallest n with n(n-1)/2 == len
    let n = ((1.0 + (1.0 + 8.0 * len as f64).sqrt()) / 2.0).round() as usize;
    if condensed_len(n) != len {
        return Err(AnalysisError::InvalidParameter(format!(
            "{len} is not a condensed distance vector length"
        )));
    }
    let mut square = Array2::zeros((n, n));
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            square[[i, j]] = condensed[k];
            square[[j, i]] = condensed[k];
            k += 1;
        }
    }
    Ok(square)
}
