//! Brain volumes and label masks.

use std::path::Path;

use anyhow::Context;
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

/// A series of brain volumes: [volume, x, y, z].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrainImage {
    pub data: Array4<f32>,
}

impl BrainImage {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    pub fn n_volumes(&self) -> usize {
        self.data.shape()[0]
    }

    /// Spatial shape (x, y, z).
    pub fn spatial(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[1], s[2], s[3]]
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_bincode(self, path, "brain image")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        read_bincode(path, "brain image")
    }
}

/// Integer ROI labels per voxel: [x, y, z]. Label 0 is background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelMask {
    pub data: Array3<i32>,
}

impl LabelMask {
    pub fn new(data: Array3<i32>) -> Self {
        Self { data }
    }

    pub fn spatial(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    /// Non-zero labels present, ascending.
    pub fn labels(&self) -> Vec<i32> {
        let mut labels: Vec<i32> = self.data.iter().copied().filter(|&l| l != 0).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_bincode(self, path, "label mask")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        read_bincode(path, "label mask")
    }
}

pub(crate) fn write_bincode<T: Serialize>(value: &T, path: &Path, what: &str) -> anyhow::Result<()> {
    let bytes = bincode::serialize(value)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write {what} '{}'", path.display()))
}

pub(crate) fn read_bincode<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> anyhow::Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {what} '{}'", path.display()))?;
    bincode::deserialize(&bytes).with_context(|| format!("malformed {what} '{}'", path.display()))
}
