//! RDM container: one stacked array of condensed dissimilarity vectors per
//! layer, written to disk with bincode.

use std::path::Path;

use anyhow::Context;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::DNN_RDM_TYPE;

/// RDMs of one layer: [iteration unit, n(n−1)/2].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRdm {
    pub name: String,
    pub data: Array2<f64>,
}

impl LayerRdm {
    pub fn n_units(&self) -> usize {
        self.data.nrows()
    }
}

/// RDMs of every processed layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RdmSet {
    /// RDM type tag, `dRDM` for DNN activations.
    pub rdm_type: String,

    /// Rows hold only the strict upper triangle.
    pub triu: bool,

    /// Category labels the RDM rows/columns stand for, when averaged by
    /// category; `None` means one row per stimulus.
    pub categories: Option<Vec<i64>>,

    layers: Vec<LayerRdm>,
}

impl RdmSet {
    /// Empty DNN RDM set.
    pub fn new() -> Self {
        Self {
            rdm_type: DNN_RDM_TYPE.to_string(),
            triu: true,
            categories: None,
            layers: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, data: Array2<f64>) {
        self.layers.push(LayerRdm {
            name: name.into(),
            data,
        });
    }

    pub fn get(&self, name: &str) -> Option<&LayerRdm> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerRdm> {
        self.layers.iter()
    }

    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write RDM file '{}'", path.display()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read RDM file '{}'", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("malformed RDM file '{}'", path.display()))
    }
}

impl Default for RdmSet {
    fn default() -> Self {
        Self::new()
    }
}
