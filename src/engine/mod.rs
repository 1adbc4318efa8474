//! Design and mockup engine
//!
//! - Image fetching and normalization
//! - Design generation through the image-edit service
//! - Mockup base selection
//! - Compositing
//! - Request pipeline

mod asset;
mod compositor;
mod fetcher;
mod generator;
mod mockup;
mod pipeline;

pub use asset::ImageAsset;
pub use fetcher::ImageFetcher;
pub use pipeline::{
    DesignRequest, ErrorKind, PipelineOrchestrator, PipelineOutput, GARMENT_FIELD, GIFT_MOCKUP_ROLE,
    PRIMARY_MOCKUP_ROLE, SUBJECT_FIELD,
};
