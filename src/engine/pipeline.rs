//! Per-request design pipeline
//!
//! Uploads are validated and decoded, one design is generated, every mockup
//! variant is composited from it, and only then are the artifacts uploaded.
//! A failure at any stage ends the request; nothing is uploaded for it unless
//! every variant was composited.

use bytes::Bytes;
use chrono::Utc;
use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::domain::{
    non_blank, truncate, Artifact, PlacementError, PlacementOverrides, PlacementParams, SourceSpec,
};
use crate::providers::{ImageEditService, Storefront};
use crate::storage::{ArtifactStore, StorageError};
use super::asset::{AssetError, ImageAsset};
use super::compositor::{composite, CompositeError};
use super::fetcher::ImageFetcher;
use super::generator::{DesignGenerator, GenerationError, GenerationRequest};
use super::mockup::{MockupError, MockupResolver};

/// Multipart field of the subject (pet) photo
pub const SUBJECT_FIELD: &str = "dogImage";
/// Multipart field of the garment photo
pub const GARMENT_FIELD: &str = "jerseyImage";

/// Artifact role of the generated design
pub const DESIGN_ROLE: &str = "design";
/// Artifact role of the primary mockup
pub const PRIMARY_MOCKUP_ROLE: &str = "mockup";
/// Artifact role of the gift mockup
pub const GIFT_MOCKUP_ROLE: &str = "gift-mockup";

/// Who is at fault for a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ClientInput,
    Internal,
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required upload: {0}")]
    MissingUpload(&'static str),

    #[error("Upload {field} exceeds {limit} bytes")]
    UploadTooLarge { field: &'static str, limit: usize },

    #[error("Upload {field} is not a readable image: {source}")]
    InvalidUpload {
        field: &'static str,
        #[source]
        source: AssetError,
    },

    #[error("Invalid placement: {0}")]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Mockup(#[from] MockupError),

    #[error("Mockup compositing failed: {0}")]
    Composite(#[from] CompositeError),

    #[error("Compositing task failed: {0}")]
    Task(#[from] JoinError),

    #[error("Upload of {key} failed: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingUpload(_)
            | PipelineError::UploadTooLarge { .. }
            | PipelineError::InvalidUpload { .. }
            | PipelineError::Placement(_)
            | PipelineError::Mockup(_) => ErrorKind::ClientInput,
            PipelineError::Generation(e) if e.is_client_input() => ErrorKind::ClientInput,
            _ => ErrorKind::Internal,
        }
    }

    /// Message safe to show to API callers
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::MissingUpload(_) => {
                format!("Both {} and {} are required", SUBJECT_FIELD, GARMENT_FIELD)
            }
            PipelineError::UploadTooLarge { field, .. } => {
                format!("{} exceeds the upload size limit", field)
            }
            PipelineError::InvalidUpload { field, .. } => format!("{} is not a readable image", field),
            PipelineError::Placement(e) => e.to_string(),
            PipelineError::Generation(GenerationError::ReferenceUrl(_)) => {
                "referenceImageUrl is invalid or could not be loaded".to_string()
            }
            PipelineError::Mockup(_) => "customMockupUrl is invalid or could not be loaded".to_string(),
            _ => "Design generation failed".to_string(),
        }
    }
}

/// One generate-simple request
#[derive(Debug, Clone, Default)]
pub struct DesignRequest {
    pub subject: Option<Bytes>,
    pub garment: Option<Bytes>,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub mockup_type: Option<String>,
    pub prompt: Option<String>,
    pub reference_url: Option<String>,
    pub custom_mockup_url: Option<String>,
    pub placement: PlacementOverrides,
}

/// Public URL of one uploaded mockup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockupOutput {
    pub role: &'static str,
    pub url: String,
}

/// Result of a successful request
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub design_url: String,
    /// In variant order; the primary mockup comes first
    pub mockups: Vec<MockupOutput>,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
}

impl PipelineOutput {
    pub fn mockup_url(&self, role: &str) -> Option<&str> {
        self.mockups
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.url.as_str())
    }

    pub fn mockup_urls(&self) -> Vec<String> {
        self.mockups.iter().map(|m| m.url.clone()).collect()
    }
}

/// A mockup rendered from the shared design
#[derive(Debug, Clone)]
struct MockupVariant {
    role: &'static str,
    variant_type: Option<String>,
    custom_url: Option<String>,
}

/// Sequences fetch, generation, compositing and upload for a request
pub struct PipelineOrchestrator {
    generator: DesignGenerator,
    resolver: MockupResolver,
    store: Arc<dyn ArtifactStore>,
    storefront: Option<Arc<dyn Storefront>>,
    reference_path: PathBuf,
    placement_defaults: PlacementParams,
    gift_variant: Option<String>,
    max_upload_bytes: usize,
}

impl PipelineOrchestrator {
    pub fn new(
        settings: &Settings,
        fetcher: ImageFetcher,
        service: Arc<dyn ImageEditService>,
        store: Arc<dyn ArtifactStore>,
        storefront: Option<Arc<dyn Storefront>>,
    ) -> Self {
        PipelineOrchestrator {
            generator: DesignGenerator::new(fetcher.clone(), service, &settings.generation),
            resolver: MockupResolver::new(fetcher, &settings.assets),
            store,
            storefront,
            reference_path: settings.assets.reference_path.clone(),
            placement_defaults: PlacementParams::from(&settings.placement),
            gift_variant: settings.mockups.gift_variant().map(str::to_string),
            max_upload_bytes: settings.uploads.max_file_bytes,
        }
    }

    /// Run the whole pipeline for one request
    #[instrument(skip(self, request), fields(product_id = request.product_id.as_deref().unwrap_or("")))]
    pub async fn run(&self, request: DesignRequest) -> Result<PipelineOutput, PipelineError> {
        let subject = self.require_upload(request.subject.clone(), SUBJECT_FIELD)?;
        let garment = self.require_upload(request.garment.clone(), GARMENT_FIELD)?;

        let placement = request.placement.apply(self.placement_defaults);
        placement.validate()?;

        info!(
            reference_url = non_blank(request.reference_url.as_deref()).map(|u| truncate(u, 120)).unwrap_or(""),
            custom_mockup_url = non_blank(request.custom_mockup_url.as_deref()).map(|u| truncate(u, 120)).unwrap_or(""),
            mockup_type = request.mockup_type.as_deref().unwrap_or(""),
            custom_prompt = non_blank(request.prompt.as_deref()).is_some(),
            placement_override = !request.placement.is_empty(),
            scale = placement.scale,
            pos_x = placement.pos_x,
            pos_y = placement.pos_y,
            "Design request received"
        );

        let (subject, garment) = tokio::try_join!(
            decode_upload(subject, SUBJECT_FIELD),
            decode_upload(garment, GARMENT_FIELD),
        )?;

        let reference = SourceSpec::override_or_default(request.reference_url.as_deref(), &self.reference_path);
        let design = self
            .generator
            .generate(GenerationRequest {
                reference,
                subject,
                garment: garment.clone(),
                prompt: request.prompt.clone(),
            })
            .await?;
        let design = Arc::new(design);

        let variants = self.variants(&request);
        let rendered = try_join_all(
            variants
                .iter()
                .map(|variant| self.render_variant(variant, &design, &garment, placement)),
        )
        .await?;

        let timestamp = Utc::now().timestamp_millis();
        let product_id = non_blank(request.product_id.as_deref());

        let design_url = self
            .upload(Artifact::png(DESIGN_ROLE, product_id, timestamp, design.png_bytes()))
            .await?;

        let mut mockups = Vec::with_capacity(rendered.len());
        for (variant, asset) in variants.iter().zip(rendered) {
            let url = self
                .upload(Artifact::png(variant.role, product_id, timestamp, asset.png_bytes()))
                .await?;
            mockups.push(MockupOutput { role: variant.role, url });
        }

        if let Some(primary) = mockups.first() {
            self.attach_to_storefront(product_id, &primary.url);
        }

        info!(
            design_url = %design_url,
            mockups = mockups.len(),
            "Design request completed"
        );

        Ok(PipelineOutput {
            design_url,
            mockups,
            product_id: request.product_id,
            variant_id: request.variant_id,
        })
    }

    fn require_upload(&self, upload: Option<Bytes>, field: &'static str) -> Result<Bytes, PipelineError> {
        let bytes = upload
            .filter(|b| !b.is_empty())
            .ok_or(PipelineError::MissingUpload(field))?;
        if bytes.len() > self.max_upload_bytes {
            return Err(PipelineError::UploadTooLarge {
                field,
                limit: self.max_upload_bytes,
            });
        }
        Ok(bytes)
    }

    /// Primary variant, plus the gift variant when one is configured
    fn variants(&self, request: &DesignRequest) -> Vec<MockupVariant> {
        let mut variants = vec![MockupVariant {
            role: PRIMARY_MOCKUP_ROLE,
            variant_type: request.mockup_type.clone(),
            custom_url: request.custom_mockup_url.clone(),
        }];
        if let Some(gift) = &self.gift_variant {
            variants.push(MockupVariant {
                role: GIFT_MOCKUP_ROLE,
                variant_type: Some(gift.clone()),
                custom_url: None,
            });
        }
        variants
    }

    async fn render_variant(
        &self,
        variant: &MockupVariant,
        design: &Arc<ImageAsset>,
        garment: &ImageAsset,
        placement: PlacementParams,
    ) -> Result<ImageAsset, PipelineError> {
        let base = self
            .resolver
            .resolve_base(variant.variant_type.as_deref(), variant.custom_url.as_deref(), garment)
            .await?;

        info!(
            variant = variant.role,
            origin = %base.origin,
            base_width = base.asset.width(),
            base_height = base.asset.height(),
            "Compositing mockup"
        );

        let design = Arc::clone(design);
        let mockup = tokio::task::spawn_blocking(move || composite(&base.asset, &design, &placement)).await??;
        Ok(mockup)
    }

    async fn upload(&self, artifact: Artifact) -> Result<String, PipelineError> {
        let size = artifact.bytes.len();
        let url = self
            .store
            .put(artifact.bytes, &artifact.filename, artifact.mime_type)
            .await
            .map_err(|source| PipelineError::Storage {
                key: artifact.filename.clone(),
                source,
            })?;

        info!(key = %artifact.filename, bytes = size, "Artifact uploaded");
        Ok(url)
    }

    /// Fire-and-forget; the response never waits on the storefront
    fn attach_to_storefront(&self, product_id: Option<&str>, mockup_url: &str) {
        let (Some(storefront), Some(product_id)) = (self.storefront.clone(), product_id) else {
            return;
        };

        let product_id = product_id.to_string();
        let mockup_url = mockup_url.to_string();
        tokio::spawn(async move {
            match storefront.attach_product_image(&product_id, &mockup_url).await {
                Ok(()) => debug!(product_id = %product_id, "Storefront image update finished"),
                Err(e) => warn!(product_id = %product_id, error = %e, "Storefront image update failed"),
            }
        });
    }
}

async fn decode_upload(bytes: Bytes, field: &'static str) -> Result<ImageAsset, PipelineError> {
    ImageAsset::decode_blocking(bytes)
        .await
        .map_err(|source| PipelineError::InvalidUpload { field, source })
}
