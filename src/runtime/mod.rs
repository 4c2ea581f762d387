//! Runtime module: the command pipelines driven by the CLI binary.
//!
//! Each pipeline loads its inputs, runs one analysis and writes one
//! container; see [`pipeline`].

pub mod pipeline;

pub use pipeline::{
    run_feature, run_rdm, run_roi, ActivationFilter, FeatureConfig, RdmConfig, RoiConfig,
};
