//! Design generation
//!
//! Sends the reference, subject and garment images to the image-edit service
//! in that order and decodes the single image it returns.

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::GenerationSettings;
use crate::domain::{non_blank, SourceSpec};
use crate::providers::{EditImage, ImageEditRequest, ImageEditService, ProviderError};
use super::asset::{AssetError, ImageAsset};
use super::fetcher::{FetchError, ImageFetcher};

/// Fetch label for a caller supplied reference image
pub const REFERENCE_URL_LABEL: &str = "referenceImageUrl";

const REFERENCE_LOCAL_LABEL: &str = "reference";

/// Design generation errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Reference image URL is set but not usable: {0}")]
    ReferenceUrl(#[source] FetchError),

    #[error("Reference image could not be loaded: {0}")]
    ReferenceDefault(#[source] FetchError),

    #[error("Image edit request failed: {0}")]
    Service(#[from] ProviderError),

    #[error("Generated image could not be decoded: {0}")]
    Decode(#[source] AssetError),
}

impl GenerationError {
    /// Whether the caller's input caused the failure
    pub fn is_client_input(&self) -> bool {
        matches!(self, GenerationError::ReferenceUrl(_))
    }
}

/// Input to [`DesignGenerator::generate`]
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Remote when the caller supplied a reference URL, otherwise the configured file
    pub reference: SourceSpec,
    pub subject: ImageAsset,
    pub garment: ImageAsset,
    /// Prompt override; blank means the configured prompt
    pub prompt: Option<String>,
}

/// Orchestrates the single image-edit call per request
#[derive(Clone)]
pub struct DesignGenerator {
    fetcher: ImageFetcher,
    service: Arc<dyn ImageEditService>,
    default_prompt: String,
}

impl DesignGenerator {
    pub fn new(
        fetcher: ImageFetcher,
        service: Arc<dyn ImageEditService>,
        settings: &GenerationSettings,
    ) -> Self {
        DesignGenerator {
            fetcher,
            service,
            default_prompt: settings.prompt.clone(),
        }
    }

    /// Request-level prompt if given, otherwise the configured one
    pub fn effective_prompt(&self, prompt: Option<&str>) -> String {
        non_blank(prompt)
            .map(str::to_string)
            .unwrap_or_else(|| self.default_prompt.clone())
    }

    /// Generate the design image
    ///
    /// An explicit reference URL must load; its failure is never replaced by
    /// the default reference.
    #[instrument(skip(self, request), fields(service = self.service.name()))]
    pub async fn generate(&self, request: GenerationRequest) -> Result<ImageAsset, GenerationError> {
        let explicit = request.reference.is_remote();
        let label = if explicit { REFERENCE_URL_LABEL } else { REFERENCE_LOCAL_LABEL };

        let reference = self
            .fetcher
            .fetch(&request.reference, label)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load reference image");
                if explicit {
                    GenerationError::ReferenceUrl(e)
                } else {
                    GenerationError::ReferenceDefault(e)
                }
            })?;

        info!(
            reference_source = if explicit { "url" } else { "local" },
            reference = %request.reference,
            "Reference image resolved"
        );

        let edit = ImageEditRequest {
            images: vec![
                EditImage {
                    file_name: "reference.png".to_string(),
                    png: reference.png_bytes(),
                },
                EditImage {
                    file_name: "dog.png".to_string(),
                    png: request.subject.png_bytes(),
                },
                EditImage {
                    file_name: "jersey.png".to_string(),
                    png: request.garment.png_bytes(),
                },
            ],
            prompt: self.effective_prompt(request.prompt.as_deref()),
        };

        let payload = self.service.edit(edit).await.map_err(|e| {
            error!(error = %e, "Image edit service failed");
            GenerationError::Service(e)
        })?;

        let design = ImageAsset::decode_blocking(payload)
            .await
            .map_err(GenerationError::Decode)?;

        info!(
            width = design.width(),
            height = design.height(),
            "Design generated"
        );

        Ok(design)
    }
}
