//! RDM construction from layer activations.
//!
//! For each layer the (stimulus, channel, row, column) tensor is split into
//! iteration units, each a (stimulus × feature) matrix:
//!
//! | axis      | units      | features per unit |
//! |-----------|------------|-------------------|
//! | `Layer`   | 1          | channel·row·col   |
//! | `Channel` | channel    | row·col           |
//! | `RowCol`  | row·col    | channel           |
//!
//! Rows are optionally z-scored, optionally replaced by per-category means,
//! and reduced to a condensed distance vector.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView4, Axis};

use crate::config::condensed_len;
use crate::core::activation::ActivationSet;
use crate::core::category::StimulusCategories;
use crate::error::{AnalysisError, Result};
use crate::rdm::container::RdmSet;
use crate::rdm::distance::{pdist, Metric};

/// How a layer is divided into iteration units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IterAxis {
    /// Whole layer is one unit.
    #[default]
    Layer,
    /// One unit per channel.
    Channel,
    /// One unit per spatial position.
    RowCol,
}

impl IterAxis {
    /// Number of units for an activation of the given 4-D shape.
    pub fn n_units(&self, shape: &[usize]) -> usize {
        match self {
            IterAxis::Layer => 1,
            IterAxis::Channel => shape[1],
            IterAxis::RowCol => shape[2] * shape[3],
        }
    }
}

impl fmt::Display for IterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IterAxis::Layer => "layer",
            IterAxis::Channel => "channel",
            IterAxis::RowCol => "row_col",
        })
    }
}

impl FromStr for IterAxis {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "channel" => Ok(IterAxis::Channel),
            "row_col" => Ok(IterAxis::RowCol),
            other => Err(AnalysisError::UnsupportedIterAxis(other.to_string())),
        }
    }
}

/// Split a (stimulus, channel, row, column) tensor into per-unit
/// (stimulus × feature) matrices.
pub fn unit_matrices(data: ArrayView4<f32>, axis: IterAxis) -> Vec<Array2<f64>> {
    let (n_stim, n_chn, n_row, n_col) = data.dim();
    let n_pos = n_row * n_col;
    // logical order, independent of memory layout
    let values: Vec<f64> = data.iter().map(|&v| v as f64).collect();

    match axis {
        IterAxis::Layer => {
            let m = Array2::from_shape_vec((n_stim, n_chn * n_pos), values);
            vec![m.unwrap_or_else(|_| unreachable!("length equals product of dims"))]
        }
        IterAxis::Channel | IterAxis::RowCol => {
            let flat = Array3::from_shape_vec((n_stim, n_chn, n_pos), values)
                .unwrap_or_else(|_| unreachable!("length equals product of dims"));
            if axis == IterAxis::Channel {
                (0..n_chn)
                    .map(|c| flat.slice(s![.., c, ..]).to_owned())
                    .collect()
            } else {
                (0..n_pos)
                    .map(|p| flat.slice(s![.., .., p]).to_owned())
                    .collect()
            }
        }
    }
}

/// Standardise each row to zero mean and unit (population) variance.
/// Constant rows become zeros.
pub fn zscore_rows(m: &mut Array2<f64>) {
    for mut row in m.rows_mut() {
        let n = row.len();
        if n == 0 {
            continue;
        }
        let mean = row.sum() / n as f64;
        let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
        let std = var.sqrt();
        if std == 0.0 {
            row.fill(0.0);
        } else {
            row.mapv_inplace(|v| (v - mean) / std);
        }
    }
}

/// Replace stimulus rows by their category means, categories ascending.
pub fn category_means(m: ArrayView2<f64>, categories: &StimulusCategories) -> Result<Array2<f64>> {
    check_stimulus_count(categories, m.nrows())?;
    let groups = categories.groups();
    let mut out = Array2::zeros((groups.len(), m.ncols()));
    for (mut row, indices) in out.rows_mut().into_iter().zip(groups.values()) {
        let members = m.select(Axis(0), indices);
        if let Some(mean) = members.mean_axis(Axis(0)) {
            row.assign(&mean);
        }
    }
    Ok(out)
}

fn check_stimulus_count(categories: &StimulusCategories, n_stimuli: usize) -> Result<()> {
    if categories.len() != n_stimuli {
        return Err(AnalysisError::StimulusCountMismatch {
            labels: categories.len(),
            stimuli: n_stimuli,
        });
    }
    Ok(())
}

/// Options of one RDM computation.
#[derive(Clone, Debug)]
pub struct RdmBuilder {
    pub axis: IterAxis,
    pub zscore: bool,
    pub categories: Option<StimulusCategories>,
    pub metric: Metric,
}

impl Default for RdmBuilder {
    fn default() -> Self {
        Self {
            axis: IterAxis::Layer,
            zscore: false,
            categories: None,
            metric: Metric::Euclidean,
        }
    }
}

impl RdmBuilder {
    pub fn new(axis: IterAxis, metric: Metric) -> Self {
        Self {
            axis,
            metric,
            ..Default::default()
        }
    }

    pub fn with_zscore(mut self, zscore: bool) -> Self {
        self.zscore = zscore;
        self
    }

    pub fn with_categories(mut self, categories: Option<StimulusCategories>) -> Self {
        self.categories = categories;
        self
    }

    /// Number of rows/columns of each RDM for `n_stimuli` stimuli.
    pub fn n_items(&self, n_stimuli: usize) -> usize {
        match &self.categories {
            Some(c) => c.groups().len(),
            None => n_stimuli,
        }
    }

    /// Condensed RDMs of one layer: [iteration unit, n(n−1)/2].
    pub fn build_layer(&self, data: ArrayView4<f32>) -> Result<Array2<f64>> {
        let n_stimuli = data.shape()[0];
        if let Some(categories) = &self.categories {
            check_stimulus_count(categories, n_stimuli)?;
        }

        let units = unit_matrices(data, self.axis);
        let width = condensed_len(self.n_items(n_stimuli));
        let mut out = Array2::zeros((units.len(), width));

        for (mut row, mut unit) in out.rows_mut().into_iter().zip(units) {
            if self.zscore {
                zscore_rows(&mut unit);
            }
            let unit = match &self.categories {
                Some(categories) => category_means(unit.view(), categories)?,
                None => unit,
            };
            row.assign(&pdist(unit.view(), self.metric));
        }
        Ok(out)
    }

    /// RDMs of every layer in `set`, in layer order.
    pub fn build(&self, set: &ActivationSet) -> Result<RdmSet> {
        let mut rdms = RdmSet::new();
        rdms.categories = self.categories.as_ref().map(StimulusCategories::distinct);

        for layer in set.iter() {
            let start = Instant::now();
            let rdm = self.build_layer(layer.data.view())?;
            tracing::info!(
                "layer {}: {} unit(s) × {} pairs ({}, {}) in {:.3} s",
                layer.name,
                rdm.nrows(),
                rdm.ncols(),
                self.axis,
                self.metric,
                start.elapsed().as_secs_f64(),
            );
            rdms.push(layer.name.clone(), rdm);
        }
        Ok(rdms)
    }
}
