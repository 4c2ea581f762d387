//! Histogram and power-spectrum features.

use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{AnalysisError, Result};

/// Per-row value counts over `bins` equal-width bins spanning the min–max of
/// the whole matrix. The last bin is closed on the right.
pub fn histogram_rows(m: ArrayView2<f64>, bins: usize) -> Result<Array2<f64>> {
    if bins == 0 {
        return Err(AnalysisError::InvalidParameter(
            "histogram needs at least one bin".into(),
        ));
    }
    let (lo, hi) = value_range(m);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
    let width = (hi - lo) / bins as f64;

    let mut out = Array2::zeros((m.nrows(), bins));
    for (row, mut counts) in m.rows().into_iter().zip(out.rows_mut()) {
        for &v in row.iter().filter(|v| v.is_finite()) {
            let bin = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[bin] += 1.0;
        }
    }
    Ok(out)
}

fn value_range(m: ArrayView2<f64>) -> (f64, f64) {
    m.iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// One-sided power spectrum |FFT(x)|² / n of each row, n/2 + 1 bins.
pub fn power_spectrum_rows(m: ArrayView2<f64>) -> Result<Array2<f64>> {
    let n = m.ncols();
    if n == 0 {
        return Err(AnalysisError::EmptyInput("no values to transform".into()));
    }
    let n_freqs = n / 2 + 1;
    let norm = 1.0 / n as f64;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

    let mut out = Array2::zeros((m.nrows(), n_freqs));
    for (row, mut power) in m.rows().into_iter().zip(out.rows_mut()) {
        let mut buffer: Vec<Complex<f64>> = row.iter().map(|&v| Complex::new(v, 0.0)).collect();
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (p, c) in power.iter_mut().zip(&buffer[..n_freqs]) {
            *p = (c.re * c.re + c.im * c.im) * norm;
        }
    }
    Ok(out)
}
