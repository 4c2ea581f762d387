//! DNN activation container.
//!
//! An [`ActivationSet`] holds one 4-D tensor per layer, indexed as
//! `(stimulus, channel, row, column)`. Layers keep their insertion order so
//! outputs list layers in the order they were extracted.

use std::path::Path;

use anyhow::Context;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Activation of a single layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerActivation {
    /// Layer name, e.g. `conv5` or `fc2`.
    pub name: String,

    /// Values: [stimulus, channel, row, column].
    pub data: Array4<f32>,
}

impl LayerActivation {
    pub fn n_stimuli(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn n_channels(&self) -> usize {
        self.data.shape()[1]
    }

    /// Spatial size (rows, columns).
    pub fn spatial(&self) -> (usize, usize) {
        (self.data.shape()[2], self.data.shape()[3])
    }
}

/// Ordered set of layer activations over a common stimulus list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationSet {
    layers: Vec<LayerActivation>,
}

impl ActivationSet {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer. Names must be unique and every layer must cover the
    /// same number of stimuli.
    pub fn push(&mut self, name: impl Into<String>, data: Array4<f32>) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(AnalysisError::InvalidParameter(format!(
                "duplicate layer '{name}'"
            )));
        }
        if let Some(n) = self.n_stimuli() {
            if data.shape()[0] != n {
                let mut expected = data.shape().to_vec();
                expected[0] = n;
                return Err(AnalysisError::ShapeMismatch {
                    expected,
                    got: data.shape().to_vec(),
                });
            }
        }
        self.layers.push(LayerActivation { name, data });
        Ok(())
    }

    /// Look up a layer by name.
    pub fn get(&self, name: &str) -> Option<&LayerActivation> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Stimulus count shared by all layers, or `None` for an empty set.
    pub fn n_stimuli(&self) -> Option<usize> {
        self.layers.first().map(LayerActivation::n_stimuli)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerActivation> {
        self.layers.iter()
    }

    /// Serialise to bytes.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialise from bytes.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Write the container to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write activation file '{}'", path.display()))
    }

    /// Read a container written by [`ActivationSet::save`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read activation file '{}'", path.display()))?;
        Self::from_bytes(&bytes)
            .with_context(|| format!("malformed activation file '{}'", path.display()))
    }
}
