//! Contracts for the external services the pipeline talks to
//!
//! The image-edit service turns three images and a prompt into one image.
//! The storefront receives finished mockup URLs as product media.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Provider error types
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Response contained no image")]
    MissingImage,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

// ============================================================================
// Image Edit Service
// ============================================================================

/// One input image for an edit call
#[derive(Debug, Clone)]
pub struct EditImage {
    /// Multipart file name (e.g. "reference.png")
    pub file_name: String,
    /// PNG encoded bytes
    pub png: Bytes,
}

/// Input to an image-edit call
///
/// Image order is significant; the prompt refers to the images by position.
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub images: Vec<EditImage>,
    pub prompt: String,
}

/// Generative image editing capability
#[async_trait]
pub trait ImageEditService: Send + Sync {
    /// Service name for logs (e.g. "openai")
    fn name(&self) -> &'static str;

    /// Submit one edit call and return the encoded result image
    ///
    /// Implementations make exactly one request; there is no retry.
    async fn edit(&self, request: ImageEditRequest) -> ProviderResult<Bytes>;
}

// ============================================================================
// Storefront
// ============================================================================

/// Product media updates on the storefront
#[async_trait]
pub trait Storefront: Send + Sync {
    /// Attach a publicly reachable image URL to a product
    async fn attach_product_image(&self, product_id: &str, image_url: &str) -> ProviderResult<()>;
}
