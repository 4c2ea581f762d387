//! Command pipelines: load → transform → save.
//!
//! Each job is described by a plain config struct so the CLI, tests and
//! other callers drive the same code:
//! - [`RdmConfig`] → [`run_rdm`]
//! - [`FeatureConfig`] → [`run_feature`]
//! - [`RoiConfig`] → [`run_roi`]

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};

use crate::config::{ACT_SUFFIX, RDM_SUFFIX, ROI_SUFFIX};
use crate::core::activation::ActivationSet;
use crate::core::category::StimulusCategories;
use crate::core::mask::DnnMask;
use crate::feature::{self, FeatureMethod};
use crate::rdm::{IterAxis, Metric, RdmBuilder, RdmSet};
use crate::roi::{self, BrainImage, LabelMask, RoiMethod, RoiSignals};

/// Which part of an activation container to process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivationFilter {
    /// Layer names (`--layer`).
    pub layers: Vec<String>,

    /// 1-based channel numbers applied to every listed layer (`--chn`).
    pub channels: Option<Vec<usize>>,

    /// DNN mask file (`--dmask`).
    pub dmask: Option<PathBuf>,
}

impl ActivationFilter {
    /// Resolve into a mask; `None` means all data unfiltered.
    pub fn resolve(&self) -> Result<Option<DnnMask>> {
        if self.channels.is_some() && self.layers.is_empty() {
            bail!("--chn requires --layer");
        }
        match (&self.dmask, self.layers.is_empty()) {
            (Some(_), false) => bail!("--layer and --dmask cannot be used together"),
            (Some(path), true) => Ok(Some(DnnMask::load(path)?)),
            (None, false) => Ok(Some(DnnMask::from_layers(
                &self.layers,
                self.channels.as_deref(),
            )?)),
            (None, true) => Ok(None),
        }
    }

    /// Load `path` and apply the filter.
    pub fn load(&self, path: &Path) -> Result<ActivationSet> {
        let mask = self.resolve()?;
        let set = ActivationSet::load(path)?;
        let set = match mask {
            Some(mask) => mask
                .apply(&set)
                .with_context(|| format!("cannot apply mask to '{}'", path.display()))?,
            None => set,
        };
        if set.is_empty() {
            bail!("no layer to process in '{}'", path.display());
        }
        Ok(set)
    }
}

/// RDM job.
#[derive(Clone, Debug)]
pub struct RdmConfig {
    /// Activation container.
    pub act: PathBuf,
    pub filter: ActivationFilter,
    pub iteraxis: IterAxis,
    /// Category label file; enables category averaging.
    pub cate: Option<PathBuf>,
    pub metric: Metric,
    pub zscore: bool,
    pub out: PathBuf,
}

impl Default for RdmConfig {
    fn default() -> Self {
        Self {
            act: PathBuf::new(),
            filter: ActivationFilter::default(),
            iteraxis: IterAxis::Layer,
            cate: None,
            metric: Metric::Euclidean,
            zscore: false,
            out: PathBuf::from(format!("out{RDM_SUFFIX}")),
        }
    }
}

/// Compute and save RDMs.
pub fn run_rdm(config: &RdmConfig) -> Result<RdmSet> {
    let start = Instant::now();
    warn_on_suffix(&config.out, RDM_SUFFIX);

    let categories = config
        .cate
        .as_deref()
        .map(StimulusCategories::load)
        .transpose()?;
    let set = config.filter.load(&config.act)?;
    tracing::info!(
        "loaded {} layer(s) × {} stimuli from '{}'",
        set.len(),
        set.n_stimuli().unwrap_or(0),
        config.act.display()
    );
    if let Some(categories) = &categories {
        tracing::info!("averaging within {} categories", categories.distinct().len());
    }

    let builder = RdmBuilder::new(config.iteraxis, config.metric)
        .with_zscore(config.zscore)
        .with_categories(categories);
    let rdms = builder.build(&set)?;

    rdms.save(&config.out)?;
    tracing::info!(
        "wrote '{}' in {:.3} s",
        config.out.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(rdms)
}

/// Feature extraction job.
#[derive(Clone, Debug)]
pub struct FeatureConfig {
    pub act: PathBuf,
    pub filter: ActivationFilter,
    pub iteraxis: IterAxis,
    pub method: FeatureMethod,
    pub out: PathBuf,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            act: PathBuf::new(),
            filter: ActivationFilter::default(),
            iteraxis: IterAxis::Layer,
            method: FeatureMethod::default(),
            out: PathBuf::from(format!("out{ACT_SUFFIX}")),
        }
    }
}

/// Extract and save features.
pub fn run_feature(config: &FeatureConfig) -> Result<ActivationSet> {
    let start = Instant::now();
    warn_on_suffix(&config.out, ACT_SUFFIX);

    let set = config.filter.load(&config.act)?;
    let feats = feature::extract(&set, config.iteraxis, config.method)?;

    feats.save(&config.out)?;
    tracing::info!(
        "wrote '{}' in {:.3} s",
        config.out.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(feats)
}

/// ROI signal job.
#[derive(Clone, Debug)]
pub struct RoiConfig {
    /// Brain image container.
    pub image: PathBuf,
    /// Label mask container.
    pub mask: PathBuf,
    pub method: RoiMethod,
    /// Labels to extract; empty means every label in the mask.
    pub labels: Vec<i32>,
    pub out: PathBuf,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::new(),
            mask: PathBuf::new(),
            method: RoiMethod::Mean,
            labels: Vec::new(),
            out: PathBuf::from(format!("out{ROI_SUFFIX}")),
        }
    }
}

/// Extract and save ROI signals.
pub fn run_roi(config: &RoiConfig) -> Result<RoiSignals> {
    let start = Instant::now();
    warn_on_suffix(&config.out, ROI_SUFFIX);

    let image = BrainImage::load(&config.image)?;
    let mask = LabelMask::load(&config.mask)?;
    let labels = (!config.labels.is_empty()).then_some(config.labels.as_slice());

    let signals = roi::extract_roi(&image, &mask, config.method, labels)?;
    tracing::info!(
        "{} ROI(s) × {} volume(s), method {}",
        signals.labels.len(),
        image.n_volumes(),
        config.method
    );

    signals.save(&config.out)?;
    tracing::info!(
        "wrote '{}' in {:.3} s",
        config.out.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(signals)
}

fn warn_on_suffix(path: &Path, suffix: &str) {
    let ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix));
    if !ok {
        tracing::warn!("output '{}' does not end with '{}'", path.display(), suffix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};
    use tempfile::tempdir;

    fn write_activation(dir: &Path) -> PathBuf {
        let path = dir.join("net.act.bin");
        let mut set = ActivationSet::new();
        set.push(
            "conv5",
            Array4::from_shape_vec((4, 2, 1, 1), vec![0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 3.0, 4.0])
                .unwrap(),
        )
        .unwrap();
        set.push(
            "fc1",
            Array4::from_shape_fn((4, 3, 1, 1), |(s, c, _, _)| (s * c) as f32),
        )
        .unwrap();
        set.save(&path).expect("failed to write activation");
        path
    }

    #[test]
    fn test_filter_combinations() {
        let none = ActivationFilter::default();
        assert!(none.resolve().unwrap().is_none());

        let chn_only = ActivationFilter {
            channels: Some(vec![1]),
            ..Default::default()
        };
        assert!(chn_only.resolve().is_err());

        let both = ActivationFilter {
            layers: vec!["fc1".into()],
            dmask: Some(PathBuf::from("x.dmask")),
            ..Default::default()
        };
        assert!(both.resolve().is_err());
    }

    #[test]
    fn test_run_rdm_whole_layer() {
        let dir = tempdir().expect("failed to create tempdir");
        let config = RdmConfig {
            act: write_activation(dir.path()),
            out: dir.path().join("net.rdm.bin"),
            ..Default::default()
        };
        let rdms = run_rdm(&config).expect("rdm job should succeed");
        assert_eq!(rdms.layer_names(), vec!["conv5", "fc1"]);
        assert_eq!(rdms.get("conv5").unwrap().data.dim(), (1, 6));

        let saved = RdmSet::load(&config.out).expect("output should load");
        assert_eq!(saved, rdms);
        assert!(saved.triu);
    }

    #[test]
    fn test_run_rdm_with_layer_channel_and_categories() {
        let dir = tempdir().expect("failed to create tempdir");
        let cate = dir.path().join("stim.cate.txt");
        std::fs::write(&cate, "label\n0\n0\n1\n1\n").unwrap();
        let config = RdmConfig {
            act: write_activation(dir.path()),
            filter: ActivationFilter {
                layers: vec!["fc1".into()],
                channels: Some(vec![2, 3]),
                dmask: None,
            },
            iteraxis: IterAxis::Channel,
            cate: Some(cate),
            out: dir.path().join("fc1.rdm.bin"),
            ..Default::default()
        };
        let rdms = run_rdm(&config).expect("rdm job should succeed");
        assert_eq!(rdms.layer_names(), vec!["fc1"]);
        assert_eq!(rdms.get("fc1").unwrap().data.dim(), (2, 1));
        assert_eq!(rdms.categories, Some(vec![0, 1]));
        // channel 2 (c = 1): stimulus values 0 1 2 3 → means 0.5, 2.5
        assert_eq!(rdms.get("fc1").unwrap().data, array![[2.0], [4.0]]);
    }

    #[test]
    fn test_run_rdm_category_mismatch_fails() {
        let dir = tempdir().expect("failed to create tempdir");
        let cate = dir.path().join("stim.cate.txt");
        std::fs::write(&cate, "0\n0\n1\n").unwrap();
        let out = dir.path().join("bad.rdm.bin");
        let config = RdmConfig {
            act: write_activation(dir.path()),
            cate: Some(cate),
            out: out.clone(),
            ..Default::default()
        };
        let err = run_rdm(&config).unwrap_err();
        assert!(err.to_string().contains("3 stimuli"));
        assert!(!out.exists());
    }

    #[test]
    fn test_run_rdm_with_dmask_file() {
        let dir = tempdir().expect("failed to create tempdir");
        let dmask = dir.path().join("net.dmask.txt");
        std::fs::write(&dmask, "fc1 chn=1,2\n").unwrap();
        let config = RdmConfig {
            act: write_activation(dir.path()),
            filter: ActivationFilter {
                dmask: Some(dmask),
                ..Default::default()
            },
            iteraxis: IterAxis::RowCol,
            zscore: true,
            out: dir.path().join("mask.rdm.bin"),
            ..Default::default()
        };
        let rdms = run_rdm(&config).expect("rdm job should succeed");
        assert_eq!(rdms.layer_names(), vec!["fc1"]);
        assert_eq!(rdms.get("fc1").unwrap().data.dim(), (1, 6));
    }

    #[test]
    fn test_run_rdm_unknown_layer() {
        let dir = tempdir().expect("failed to create tempdir");
        let config = RdmConfig {
            act: write_activation(dir.path()),
            filter: ActivationFilter {
                layers: vec!["conv9".into()],
                ..Default::default()
            },
            out: dir.path().join("x.rdm.bin"),
            ..Default::default()
        };
        assert!(run_rdm(&config).is_err());
    }

    #[test]
    fn test_run_feature() {
        let dir = tempdir().expect("failed to create tempdir");
        let config = FeatureConfig {
            act: write_activation(dir.path()),
            iteraxis: IterAxis::Channel,
            method: FeatureMethod::Psd,
            out: dir.path().join("psd.act.bin"),
            ..Default::default()
        };
        let feats = run_feature(&config).expect("feature job should succeed");
        assert_eq!(feats.get("fc1").unwrap().data.shape(), &[4, 3, 1, 1]);
        assert_eq!(ActivationSet::load(&config.out).unwrap(), feats);
    }

    #[test]
    fn test_run_roi() {
        let dir = tempdir().expect("failed to create tempdir");
        let image = dir.path().join("bold.img.bin");
        let mask = dir.path().join("atlas.mask.bin");
        BrainImage::new(Array4::from_elem((3, 2, 1, 1), 2.0))
            .save(&image)
            .unwrap();
        LabelMask::new(array![[[1]], [[4]]]).save(&mask).unwrap();

        let config = RoiConfig {
            image,
            mask,
            labels: vec![4],
            out: dir.path().join("sub.roi.bin"),
            ..Default::default()
        };
        let signals = run_roi(&config).expect("roi job should succeed");
        assert_eq!(signals.labels, vec![4]);
        assert_eq!(signals.signal(4), Some(vec![2.0, 2.0, 2.0]));
        assert_eq!(RoiSignals::load(&config.out).unwrap(), signals);
    }
}
