//! Representational dissimilarity matrices.
//!
//! - `distance`: condensed pairwise distances (`pdist`, `squareform`)
//! - `builder`: per-layer RDMs over iteration units, with optional
//!   z-scoring and category averaging
//! - `container`: the on-disk RDM set

pub mod builder;
pub mod container;
pub mod distance;

pub use builder::{IterAxis, RdmBuilder};
pub use container::{LayerRdm, RdmSet};
pub use distance::{pdist, squareform, Metric};
