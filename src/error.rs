//! Domain errors for the analysis procedures.
//!
//! File handling and command orchestration use `anyhow`; everything the
//! numeric code can reject is one of these variants.

use thiserror::Error;

/// Errors raised by masking, RDM, feature and ROI procedures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Iteration axis name not in {channel, row_col}.
    #[error("unsupported iteration axis '{0}' (expected 'channel' or 'row_col')")]
    UnsupportedIterAxis(String),

    /// Distance metric name unknown to `pdist`.
    #[error("unsupported distance metric '{0}'")]
    UnsupportedMetric(String),

    /// Category label count differs from the activation's stimulus count.
    #[error("category labels cover {labels} stimuli but the activation has {stimuli}")]
    StimulusCountMismatch { labels: usize, stimuli: usize },

    /// A layer was requested that the data does not contain.
    #[error("layer '{0}' not found")]
    UnknownLayer(String),

    /// An index along some axis is outside the data.
    #[error("{axis} index {index} out of range (size {size})")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        size: usize,
    },

    /// Nothing left to process.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A numeric parameter outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// An ROI label was requested that the mask does not contain.
    #[error("label {0} not present in mask")]
    UnknownLabel(i32),

    /// Feature or aggregation method name not recognised.
    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
