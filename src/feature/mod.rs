//! Compact features from DNN layer activations.
//!
//! A layer is split into iteration units exactly as for RDMs; each unit's
//! (stimulus × feature) matrix is reduced to a shorter per-stimulus vector:
//!
//! - `hist`: value histogram per stimulus
//! - `psd`: one-sided power spectrum per stimulus
//! - `pca`: principal component scores across stimuli
//!
//! Results are stored as activations of shape (stimulus, unit, feature, 1),
//! so a feature file can be fed straight back into the RDM command.

pub mod pca;
pub mod spectral;

use std::fmt;
use std::time::Instant;

use ndarray::{s, Array2, Array4, ArrayView4};

use crate::config::DEFAULT_HIST_BINS;
use crate::core::activation::ActivationSet;
use crate::error::{AnalysisError, Result};
use crate::rdm::builder::{unit_matrices, IterAxis};

/// Feature reduction applied to each iteration unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureMethod {
    Hist { bins: usize },
    Psd,
    Pca { n_components: usize },
}

impl FeatureMethod {
    /// Resolve a method name with its parameters.
    pub fn from_name(name: &str, bins: usize, n_components: usize) -> Result<Self> {
        match name {
            "hist" => Ok(FeatureMethod::Hist { bins }),
            "psd" => Ok(FeatureMethod::Psd),
            "pca" => Ok(FeatureMethod::Pca { n_components }),
            other => Err(AnalysisError::UnsupportedMethod(other.to_string())),
        }
    }

    fn reduce(&self, unit: &Array2<f64>) -> Result<Array2<f64>> {
        match *self {
            FeatureMethod::Hist { bins } => spectral::histogram_rows(unit.view(), bins),
            FeatureMethod::Psd => spectral::power_spectrum_rows(unit.view()),
            FeatureMethod::Pca { n_components } => pca::pca_scores(unit.view(), n_components),
        }
    }
}

impl Default for FeatureMethod {
    fn default() -> Self {
        FeatureMethod::Hist {
            bins: DEFAULT_HIST_BINS,
        }
    }
}

impl fmt::Display for FeatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureMethod::Hist { bins } => write!(f, "hist({bins})"),
            FeatureMethod::Psd => f.write_str("psd"),
            FeatureMethod::Pca { n_components } => write!(f, "pca({n_components})"),
        }
    }
}

/// Features of one layer: [stimulus, unit, feature, 1].
pub fn extract_layer(
    data: ArrayView4<f32>,
    axis: IterAxis,
    method: FeatureMethod,
) -> Result<Array4<f32>> {
    let units = unit_matrices(data, axis);
    let reduced = units
        .iter()
        .map(|unit| method.reduce(unit))
        .collect::<Result<Vec<_>>>()?;

    let n_stimuli = data.shape()[0];
    let n_features = reduced.first().map_or(0, |r| r.ncols());
    let mut out = Array4::zeros((n_stimuli, reduced.len(), n_features, 1));
    for (u, feats) in reduced.iter().enumerate() {
        out.slice_mut(s![.., u, .., 0])
            .assign(&feats.mapv(|v| v as f32));
    }
    Ok(out)
}

/// Features of every layer in `set`.
pub fn extract(set: &ActivationSet, axis: IterAxis, method: FeatureMethod) -> Result<ActivationSet> {
    let mut out = ActivationSet::new();
    for layer in set.iter() {
        let start = Instant::now();
        let feats = extract_layer(layer.data.view(), axis, method)?;
        tracing::info!(
            "layer {}: {} ({}) → {} unit(s) × {} feature(s) in {:.3} s",
            layer.name,
            method,
            axis,
            feats.shape()[1],
            feats.shape()[2],
            start.elapsed().as_secs_f64(),
        );
        out.push(layer.name.clone(), feats)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PCA_COMPONENTS;

    fn ramp(shape: (usize, usize, usize, usize)) -> Array4<f32> {
        Array4::from_shape_fn(shape, |(s, c, r, q)| {
            ((s * 3 + c * 7 + r * 2 + q * 5) % 13) as f32
        })
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            FeatureMethod::from_name("hist", 8, 2).unwrap(),
            FeatureMethod::Hist { bins: 8 }
        );
        assert_eq!(FeatureMethod::from_name("psd", 8, 2).unwrap(), FeatureMethod::Psd);
        assert_eq!(
            FeatureMethod::from_name("pca", 8, 2).unwrap(),
            FeatureMethod::Pca { n_components: 2 }
        );
        assert!(matches!(
            FeatureMethod::from_name("ica", 8, 2),
            Err(AnalysisError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_hist_shapes_and_counts() {
        let data = ramp((4, 3, 2, 3));
        let out = extract_layer(data.view(), IterAxis::Channel, FeatureMethod::Hist { bins: 5 })
            .unwrap();
        assert_eq!(out.shape(), &[4, 3, 5, 1]);
        for stim in 0..4 {
            for u in 0..3 {
                let total: f32 = out.slice(s![stim, u, .., 0]).sum();
                assert_eq!(total, 6.0);
            }
        }
    }

    #[test]
    fn test_psd_shape_row_col() {
        let data = ramp((2, 6, 2, 2));
        let out = extract_layer(data.view(), IterAxis::RowCol, FeatureMethod::Psd).unwrap();
        assert_eq!(out.shape(), &[2, 4, 4, 1]);
    }

    fn pca_default() -> FeatureMethod {
        FeatureMethod::from_name("pca", DEFAULT_HIST_BINS, DEFAULT_PCA_COMPONENTS).unwrap()
    }

    #[test]
    fn test_pca_whole_layer() {
        let data = ramp((5, 2, 2, 2));
        let out = extract_layer(data.view(), IterAxis::Layer, pca_default()).unwrap();
        assert_eq!(out.shape(), &[5, 1, 3, 1]);
        for k in 0..3 {
            let mean: f32 = out.slice(s![.., 0, k, 0]).sum() / 5.0;
            assert!(mean.abs() < 1e-4);
        }
    }

    #[test]
    fn test_pca_too_many_components() {
        let data = ramp((3, 2, 1, 1));
        let err = extract_layer(data.view(), IterAxis::Layer, pca_default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
    }

    #[test]
    fn test_extract_feeds_rdm() {
        let mut set = ActivationSet::new();
        set.push("conv2", ramp((4, 2, 3, 3))).unwrap();
        let feats = extract(&set, IterAxis::Channel, FeatureMethod::default()).unwrap();
        let conv = feats.get("conv2").unwrap();
        assert_eq!(conv.data.shape(), &[4, 2, 10, 1]);

        let rdms = crate::rdm::RdmBuilder::new(IterAxis::Channel, crate::rdm::Metric::Euclidean)
            .build(&feats)
            .unwrap();
        assert_eq!(rdms.get("conv2").unwrap().data.dim(), (2, 6));
    }
}
