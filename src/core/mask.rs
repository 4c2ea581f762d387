//! DNN mask: which layers, channels and spatial positions to process.
//!
//! Indices are 1-based in mask files and on the command line, 0-based once
//! parsed. Mask file format, one layer per line:
//!
//! ```text
//! # layer  [chn=..] [row=..] [col=..]
//! conv5 chn=1,2,3 row=2,3 col=2,3
//! fc2
//! ```

use std::path::Path;

use anyhow::{bail, Context};
use ndarray::Axis;

use crate::core::activation::ActivationSet;
use crate::error::{AnalysisError, Result};

/// Selection within one layer. `None` keeps the whole axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerMask {
    pub layer: String,
    pub channels: Option<Vec<usize>>,
    pub rows: Option<Vec<usize>>,
    pub cols: Option<Vec<usize>>,
}

impl LayerMask {
    /// Whole-layer selection.
    pub fn whole(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            ..Default::default()
        }
    }
}

/// Ordered list of layer selections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DnnMask {
    entries: Vec<LayerMask>,
}

impl DnnMask {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a layer entry, replacing an earlier entry for the same layer.
    pub fn push(&mut self, entry: LayerMask) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.layer == entry.layer) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn get(&self, layer: &str) -> Option<&LayerMask> {
        self.entries.iter().find(|e| e.layer == layer)
    }

    pub fn layers(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.layer.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a mask from `--layer` names and optional 1-based `--chn`
    /// numbers applied to every listed layer.
    pub fn from_layers(layers: &[String], channels: Option<&[usize]>) -> Result<Self> {
        if layers.is_empty() {
            return Err(AnalysisError::EmptyInput("no layer given".into()));
        }
        let channels = channels.map(|c| to_zero_based(c, "channel")).transpose()?;
        let mut mask = Self::new();
        for layer in layers {
            mask.push(LayerMask {
                layer: layer.clone(),
                channels: channels.clone(),
                ..Default::default()
            });
        }
        Ok(mask)
    }

    /// Parse the line-oriented mask format.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut mask = Self::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(layer) = fields.next() else {
                continue;
            };
            let mut entry = LayerMask::whole(layer);
            for field in fields {
                let Some((key, value)) = field.split_once('=') else {
                    bail!("line {}: expected key=value, got '{}'", lineno + 1, field);
                };
                let numbers = parse_index_list(value)
                    .with_context(|| format!("line {}: bad index list '{}'", lineno + 1, value))?;
                let indices = match key {
                    "chn" => &mut entry.channels,
                    "row" => &mut entry.rows,
                    "col" => &mut entry.cols,
                    other => bail!("line {}: unknown mask key '{}'", lineno + 1, other),
                };
                *indices = Some(to_zero_based(&numbers, key)?);
            }
            mask.push(entry);
        }
        if mask.is_empty() {
            bail!("mask lists no layer");
        }
        Ok(mask)
    }

    /// Read a mask file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read mask file '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid mask file '{}'", path.display()))
    }

    /// Restrict `set` to the masked layers (in mask order) and indices.
    pub fn apply(&self, set: &ActivationSet) -> Result<ActivationSet> {
        let mut out = ActivationSet::new();
        for entry in &self.entries {
            let layer = set
                .get(&entry.layer)
                .ok_or_else(|| AnalysisError::UnknownLayer(entry.layer.clone()))?;
            let mut data = layer.data.clone();
            for (axis, name, indices) in [
                (1, "channel", &entry.channels),
                (2, "row", &entry.rows),
                (3, "column", &entry.cols),
            ] {
                if let Some(indices) = indices {
                    let size = data.shape()[axis];
                    if let Some(&bad) = indices.iter().find(|&&i| i >= size) {
                        return Err(AnalysisError::IndexOutOfRange {
                            axis: name,
                            index: bad + 1,
                            size,
                        });
                    }
                    data = data.select(Axis(axis), indices);
                }
            }
            out.push(entry.layer.clone(), data)?;
        }
        Ok(out)
    }
}

fn parse_index_list(value: &str) -> anyhow::Result<Vec<usize>> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse::<usize>().map_err(anyhow::Error::from))
        .collect()
}

/// Convert 1-based user indices to 0-based.
fn to_zero_based(indices: &[usize], axis: &str) -> Result<Vec<usize>> {
    if indices.is_empty() {
        return Err(AnalysisError::EmptyInput(format!("empty {axis} list")));
    }
    indices
        .iter()
        .map(|&i| {
            i.checked_sub(1).ok_or_else(|| {
                AnalysisError::InvalidParameter(format!("{axis} numbers start at 1, got 0"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn sample_set() -> ActivationSet {
        let conv = Array4::from_shape_fn((2, 3, 2, 2), |(s, c, r, q)| {
            (s * 1000 + c * 100 + r * 10 + q) as f32
        });
        let fc = Array4::from_shape_fn((2, 5, 1, 1), |(s, c, _, _)| (s * 10 + c) as f32);
        let mut set = ActivationSet::new();
        set.push("conv5", conv).unwrap();
        set.push("fc2", fc).unwrap();
        set
    }

    #[test]
    fn test_from_layers_selects_channels() {
        let mask = DnnMask::from_layers(&["conv5".to_string()], Some(&[1, 3][..])).unwrap();
        let out = mask.apply(&sample_set()).unwrap();
        assert_eq!(out.layer_names(), vec!["conv5"]);
        let data = &out.get("conv5").unwrap().data;
        assert_eq!(data.shape(), &[2, 2, 2, 2]);
        assert_eq!(data[[1, 1, 0, 1]], 1201.0);
    }

    #[test]
    fn test_from_layers_rejects_zero_channel() {
        let err = DnnMask::from_layers(&["conv5".to_string()], Some(&[0][..])).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
    }

    #[test]
    fn test_parse_and_apply() {
        let text = "# comment\nfc2\nconv5 chn=2 row=2 col=1,2\n";
        let mask = DnnMask::parse(text).unwrap();
        assert_eq!(mask.layers(), vec!["fc2", "conv5"]);
        assert_eq!(mask.get("conv5").unwrap().rows, Some(vec![1]));

        let out = mask.apply(&sample_set()).unwrap();
        assert_eq!(out.layer_names(), vec!["fc2", "conv5"]);
        assert_eq!(out.get("fc2").unwrap().data.shape(), &[2, 5, 1, 1]);
        let conv = &out.get("conv5").unwrap().data;
        assert_eq!(conv.shape(), &[2, 1, 1, 2]);
        assert_eq!(conv[[0, 0, 0, 1]], 111.0);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!(DnnMask::parse("conv5 depth=1").is_err());
        assert!(DnnMask::parse("conv5 chn").is_err());
        assert!(DnnMask::parse("# only a comment\n").is_err());
    }

    #[test]
    fn test_apply_unknown_layer() {
        let mask = DnnMask::from_layers(&["conv9".to_string()], None).unwrap();
        let err = mask.apply(&sample_set()).unwrap_err();
        assert_eq!(err, AnalysisError::UnknownLayer("conv9".into()));
    }

    #[test]
    fn test_apply_index_out_of_range() {
        let mask = DnnMask::from_layers(&["fc2".to_string()], Some(&[6][..])).unwrap();
        let err = mask.apply(&sample_set()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::IndexOutOfRange {
                axis: "channel",
                index: 6,
                size: 5
            }
        ));
    }
}
