//! Storage module for generated artifacts
//!
//! Provides Cloudflare R2 integration for publishing designs and mockups.
//! R2 is S3-compatible, so we use the AWS SDK.

mod r2;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use r2::R2Client;

/// Errors that can occur while storing artifacts
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage not configured: {0} missing")]
    NotConfigured(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// Object storage that makes uploaded bytes publicly reachable
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key` and return its public URL
    async fn put(&self, data: Bytes, key: &str, content_type: &str) -> Result<String, StorageError>;
}
