//! Region-of-interest signals from brain volumes.
//!
//! Every labelled region of a [`LabelMask`] is reduced, volume by volume, to
//! one number by an [`RoiMethod`]. The result is a (label, volume) matrix.

pub mod image;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
pub use image::{BrainImage, LabelMask};

/// Aggregation over the voxels of one region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiMethod {
    #[default]
    Mean,
    Max,
    Min,
    /// Population standard deviation.
    Std,
    Median,
}

impl RoiMethod {
    fn aggregate(&self, values: &mut [f64]) -> f64 {
        let n = values.len() as f64;
        match self {
            RoiMethod::Mean => values.iter().sum::<f64>() / n,
            RoiMethod::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            RoiMethod::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            RoiMethod::Std => {
                let mean = values.iter().sum::<f64>() / n;
                (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
            }
            RoiMethod::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        }
    }
}

impl fmt::Display for RoiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoiMethod::Mean => "mean",
            RoiMethod::Max => "max",
            RoiMethod::Min => "min",
            RoiMethod::Std => "std",
            RoiMethod::Median => "median",
        })
    }
}

impl FromStr for RoiMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(RoiMethod::Mean),
            "max" => Ok(RoiMethod::Max),
            "min" => Ok(RoiMethod::Min),
            "std" => Ok(RoiMethod::Std),
            "median" => Ok(RoiMethod::Median),
            other => Err(AnalysisError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Aggregated signal per region and volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiSignals {
    pub method: RoiMethod,
    /// Region labels, one per row of `data`.
    pub labels: Vec<i32>,
    /// [label, volume].
    pub data: Array2<f64>,
}

impl RoiSignals {
    /// Signal of one region across volumes.
    pub fn signal(&self, label: i32) -> Option<Vec<f64>> {
        let row = self.labels.iter().position(|&l| l == label)?;
        Some(self.data.row(row).to_vec())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        image::write_bincode(self, path, "ROI signals")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        image::read_bincode(path, "ROI signals")
    }
}

/// Aggregate `image` within each region of `mask`.
///
/// `labels` selects regions in the given order; `None` takes every non-zero
/// label of the mask, ascending.
pub fn extract_roi(
    image: &BrainImage,
    mask: &LabelMask,
    method: RoiMethod,
    labels: Option<&[i32]>,
) -> Result<RoiSignals> {
    if image.spatial() != mask.spatial() {
        return Err(AnalysisError::ShapeMismatch {
            expected: image.spatial().to_vec(),
            got: mask.spatial().to_vec(),
        });
    }

    let present = mask.labels();
    let labels = match labels {
        Some(requested) => {
            if let Some(&missing) = requested.iter().find(|l| !present.contains(l)) {
                return Err(AnalysisError::UnknownLabel(missing));
            }
            requested.to_vec()
        }
        None => present,
    };
    if labels.is_empty() {
        return Err(AnalysisError::EmptyInput("mask has no labelled voxel".into()));
    }

    let voxels: Vec<Vec<usize>> = labels
        .iter()
        .map(|&label| {
            mask.data
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == label)
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    let mut data = Array2::zeros((labels.len(), image.n_volumes()));
    let mut values = Vec::new();
    for (vol, mut column) in image.data.axis_iter(Axis(0)).zip(data.columns_mut()) {
        // standard-layout copy so flat voxel indices line up with the mask
        let flat: Vec<f32> = vol.iter().copied().collect();
        for (indices, out) in voxels.iter().zip(column.iter_mut()) {
            values.clear();
            values.extend(indices.iter().map(|&i| flat[i] as f64));
            *out = method.aggregate(&mut values);
        }
    }
    Ok(RoiSignals {
        method,
        labels,
        data,
    })
}
