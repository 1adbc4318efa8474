//! OpenAI image edits client
//!
//! API Docs: https://platform.openai.com/docs/api-reference/images/createEdit

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::GenerationSettings;
use super::traits::{ImageEditRequest, ImageEditService, ProviderError, ProviderResult};

/// `POST /v1/images/edits` response body
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// OpenAI image edit client
pub struct OpenAiImageEditor {
    http_client: reqwest::Client,
    settings: GenerationSettings,
}

impl OpenAiImageEditor {
    /// Create a new client; the request timeout comes from `generation.timeout_secs`
    pub fn new(settings: &GenerationSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(OpenAiImageEditor {
            http_client,
            settings: settings.clone(),
        })
    }

    /// Multipart body: model and prompt, the images in order, then fixed output parameters
    fn build_form(&self, request: ImageEditRequest) -> ProviderResult<Form> {
        let mut form = Form::new()
            .text("model", self.settings.model.clone())
            .text("prompt", request.prompt);

        for image in request.images {
            let part = Part::bytes(image.png.to_vec())
                .file_name(image.file_name)
                .mime_str("image/png")?;
            form = form.part("image[]", part);
        }

        Ok(form
            .text("input_fidelity", self.settings.input_fidelity.clone())
            .text("quality", self.settings.quality.clone())
            .text("background", self.settings.background.clone())
            .text("size", self.settings.size.clone())
            .text("output_format", self.settings.output_format.clone())
            .text("n", "1"))
    }
}

#[async_trait]
impl ImageEditService for OpenAiImageEditor {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn edit(&self, request: ImageEditRequest) -> ProviderResult<Bytes> {
        let api_key = self.settings.api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::NotConfigured("generation.api_key is not set".to_string()));
        }

        debug!(
            endpoint = %self.settings.endpoint,
            images = request.images.len(),
            prompt_chars = request.prompt.chars().count(),
            "OpenAI image edit request"
        );

        let form = self.build_form(request)?;
        let response = self
            .http_client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "OpenAI image edit failed");
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = response.text().await?;
        let parsed: ImagesResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::ParseError(format!(
                "JSON parse error: {} - Body: {}",
                e,
                crate::domain::truncate(&text, 500)
            ))
        })?;

        let b64 = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                error!(body = %crate::domain::truncate(&text, 500), "OpenAI response without b64_json");
                ProviderError::MissingImage
            })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| ProviderError::ParseError(format!("Invalid base64 image payload: {}", e)))?;

        info!(bytes = bytes.len(), "OpenAI image edit complete");
        Ok(Bytes::from(bytes))
    }
}
