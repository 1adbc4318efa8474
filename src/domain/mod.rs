//! Domain types and models

mod artifact;
mod placement;
mod source;

pub use artifact::Artifact;
pub use placement::{PlacementError, PlacementOverrides, PlacementParams};
pub use source::{non_blank, truncate, SourceSpec};
