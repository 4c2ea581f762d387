//! # neurorsa
//!
//! Analysis utilities for comparing brain and deep-network representations.
//!
//! ## Commands
//!
//! 1. **RDM**: representational dissimilarity matrices from DNN layer
//!    activations, per layer, channel or spatial location, optionally averaged
//!    within stimulus categories
//! 2. **Feature**: compact per-unit features (histogram, power spectrum,
//!    principal components) from DNN layer activations
//! 3. **ROI**: region-of-interest signals aggregated from brain volumes
//!    through a label mask
//!
//! Each command is a single sequential pipeline: load → transform → save.
//! The pipelines live in [`runtime::pipeline`]; the numeric procedures in
//! [`rdm`], [`feature`] and [`roi`].

pub mod core;
pub mod error;
pub mod feature;
pub mod rdm;
pub mod roi;
pub mod runtime;

pub use error::AnalysisError;

/// Crate-wide defaults.
pub mod config {
    /// Distance metric used when none is given.
    pub const DEFAULT_METRIC: &str = "euclidean";

    /// RDM type tag for DNN-derived RDMs.
    pub const DNN_RDM_TYPE: &str = "dRDM";

    /// Conventional suffix of RDM containers.
    pub const RDM_SUFFIX: &str = ".rdm.bin";

    /// Conventional suffix of activation / feature containers.
    pub const ACT_SUFFIX: &str = ".act.bin";

    /// Conventional suffix of ROI signal containers.
    pub const ROI_SUFFIX: &str = ".roi.bin";

    /// Default histogram bin count.
    pub const DEFAULT_HIST_BINS: usize = 10;

    /// Default number of principal components.
    pub const DEFAULT_PCA_COMPONENTS: usize = 3;

    /// Returns the number of entries in a condensed (strict upper-triangular)
    /// distance vector over `n` rows.
    pub fn condensed_len(n: usize) -> usize {
        n * n.saturating_sub(1) / 2
    }
}
