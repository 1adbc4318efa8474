//! Design generation endpoint

use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{http::StatusCode, web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use serde::Serialize;
use std::error::Error as StdError;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppState;
use crate::domain::{non_blank, PlacementOverrides};
use crate::engine::{
    DesignRequest, ErrorKind, PipelineOutput, GARMENT_FIELD, GIFT_MOCKUP_ROLE,
    PRIMARY_MOCKUP_ROLE, SUBJECT_FIELD,
};

pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const GENERATION_FAILED: &str = "GENERATION_FAILED";

/// Upper bound for a single text field
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Multipart form accepted by generate-simple (documentation only)
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct GenerateSimpleForm {
    /// Photo of the customer's pet
    #[schema(value_type = String, format = Binary)]
    dog_image: Vec<u8>,
    /// Photo of the customer's empty jersey
    #[schema(value_type = String, format = Binary)]
    jersey_image: Vec<u8>,
    product_id: Option<String>,
    variant_id: Option<String>,
    /// Template type of the primary mockup (e.g. "sweatshirt", "hoodie")
    mockup_type: Option<String>,
    /// Replaces the configured generation prompt
    prompt: Option<String>,
    /// Replaces the configured reference image; must be loadable
    reference_image_url: Option<String>,
    /// Base image for the primary mockup; must be loadable
    custom_mockup_url: Option<String>,
    /// Design width as a fraction of the base width, in (0, 1]
    design_scale: Option<f64>,
    /// Horizontal offset in half base widths, in [-1, 1]
    design_pos_x: Option<f64>,
    /// Vertical offset in half base heights, in [-1, 1]
    design_pos_y: Option<f64>,
}

/// Response for a successful generation
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSimpleResponse {
    pub success: bool,
    pub design_url: String,
    pub mockup_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_mockup_url: Option<String>,
    pub mockup_urls: Vec<String>,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
}

impl From<PipelineOutput> for GenerateSimpleResponse {
    fn from(output: PipelineOutput) -> Self {
        GenerateSimpleResponse {
            success: true,
            mockup_url: output.mockup_url(PRIMARY_MOCKUP_ROLE).map(str::to_string),
            gift_mockup_url: output.mockup_url(GIFT_MOCKUP_ROLE).map(str::to_string),
            mockup_urls: output.mockup_urls(),
            design_url: output.design_url,
            product_id: output.product_id,
            variant_id: output.variant_id,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    /// Full error chain; only present in debug mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Problems with the multipart body itself
#[derive(Debug, Error)]
enum FormError {
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{field} exceeds the upload size limit")]
    TooLarge { field: String },

    #[error("{field} must be a number")]
    InvalidNumber { field: &'static str },

    #[error("{field} must be UTF-8 text")]
    InvalidText { field: String },
}

/// POST /api/v1/designs/generate-simple - Generate a design and its mockups
#[utoipa::path(
    post,
    path = "/api/v1/designs/generate-simple",
    tag = "designs",
    request_body(content = GenerateSimpleForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Design and mockups generated", body = GenerateSimpleResponse),
        (status = 400, description = "Missing or invalid input", body = ErrorResponse),
        (status = 500, description = "Generation failed", body = ErrorResponse)
    )
)]
pub async fn generate_simple(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let debug = state.settings.server.debug;

    let request = match read_form(payload, state.settings.uploads.max_file_bytes).await {
        Ok(request) => request,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Rejected design request");
            return error_response(StatusCode::BAD_REQUEST, INVALID_INPUT, e.to_string(), debug.then(|| error_chain(&e)));
        }
    };

    match state.pipeline.run(request).await {
        Ok(output) => {
            info!(
                request_id = %request_id,
                generation_time_ms = start.elapsed().as_millis() as u64,
                mockups = output.mockups.len(),
                "Design generated successfully"
            );
            HttpResponse::Ok().json(GenerateSimpleResponse::from(output))
        }
        Err(e) => {
            let details = debug.then(|| error_chain(&e));
            match e.kind() {
                ErrorKind::ClientInput => {
                    warn!(request_id = %request_id, error = %e, "Rejected design request");
                    error_response(StatusCode::BAD_REQUEST, INVALID_INPUT, e.public_message(), details)
                }
                ErrorKind::Internal => {
                    error!(request_id = %request_id, error = %e, "Design generation failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED, e.public_message(), details)
                }
            }
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: String, details: Option<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        error: ApiError {
            code: code.to_string(),
            message,
            details,
        },
    })
}

/// `outer: inner: root` rendering of an error and its sources
fn error_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !chain.contains(&text) {
            chain.push_str(": ");
            chain.push_str(&text);
        }
        source = cause.source();
    }
    chain
}

/// Collect the multipart fields into a pipeline request
async fn read_form(mut payload: Multipart, max_file_bytes: usize) -> Result<DesignRequest, FormError> {
    let mut request = DesignRequest::default();
    let mut placement = PlacementOverrides::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            SUBJECT_FIELD => request.subject = Some(read_bytes(&mut field, &name, max_file_bytes).await?),
            GARMENT_FIELD => request.garment = Some(read_bytes(&mut field, &name, max_file_bytes).await?),
            "productId" => request.product_id = read_text(&mut field, &name).await?,
            "variantId" => request.variant_id = read_text(&mut field, &name).await?,
            "mockupType" => request.mockup_type = read_text(&mut field, &name).await?,
            "prompt" => request.prompt = read_text(&mut field, &name).await?,
            "referenceImageUrl" => request.reference_url = read_text(&mut field, &name).await?,
            "customMockupUrl" => request.custom_mockup_url = read_text(&mut field, &name).await?,
            "designScale" => placement.scale = parse_number("designScale", read_text(&mut field, &name).await?)?,
            "designPosX" => placement.pos_x = parse_number("designPosX", read_text(&mut field, &name).await?)?,
            "designPosY" => placement.pos_y = parse_number("designPosY", read_text(&mut field, &name).await?)?,
            _ => {
                // Unknown fields are drained and ignored
                while field.try_next().await?.is_some() {}
            }
        }
    }

    request.placement = placement;
    Ok(request)
}

async fn read_bytes(field: &mut Field, name: &str, limit: usize) -> Result<Bytes, FormError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.try_next().await? {
        if buffer.len() + chunk.len() > limit {
            return Err(FormError::TooLarge { field: name.to_string() });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

/// Trimmed text value; blank counts as absent
async fn read_text(field: &mut Field, name: &str) -> Result<Option<String>, FormError> {
    let bytes = read_bytes(field, name, MAX_TEXT_FIELD_BYTES).await?;
    let text = String::from_utf8(bytes.to_vec()).map_err(|_| FormError::InvalidText { field: name.to_string() })?;
    Ok(non_blank(Some(&text)).map(str::to_string))
}

fn parse_number(field: &'static str, value: Option<String>) -> Result<Option<f64>, FormError> {
    value
        .map(|v| v.parse::<f64>().map_err(|_| FormError::InvalidNumber { field }))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchSettings, Settings};
    use crate::engine::{ImageFetcher, PipelineOrchestrator};
    use crate::storage::memory::MemoryStore;
    use crate::test_helpers::{png_bytes, EditOutcome, RecordingEditor};
    use actix_web::{test as actix_test, App};
    use std::sync::Arc;

    const BOUNDARY: &str = "----jersey-forge-test";

    enum Part<'a> {
        Text(&'a str),
        File(Vec<u8>),
    }

    fn multipart_body(parts: &[(&str, Part)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, part) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}.png\"\r\nContent-Type: image/png\r\n\r\n",
                            name, name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn app_state(editor: RecordingEditor, debug: bool) -> (web::Data<AppState>, tempfile::TempDir) {
        let mut settings = Settings::default();
        settings.server.debug = debug;
        settings.assets.use_mockup_template = false;
        let dir = tempfile::tempdir().unwrap();
        settings.assets.reference_path =
            crate::test_helpers::write_png(dir.path(), "reference.png", 16, 24, [1, 1, 1, 255]);

        let fetcher = ImageFetcher::new(&FetchSettings::default()).unwrap();
        let pipeline = PipelineOrchestrator::new(
            &settings,
            fetcher,
            Arc::new(editor),
            Arc::new(MemoryStore::new("https://cdn.example.com/")),
            None,
        );

        let state = web::Data::new(AppState {
            settings,
            pipeline: Arc::new(pipeline),
        });
        (state, dir)
    }

    fn post(parts: &[(&str, Part)]) -> actix_test::TestRequest {
        actix_test::TestRequest::post()
            .uri("/api/v1/designs/generate-simple")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(parts))
    }

    macro_rules! service {
        ($state:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data($state)
                    .route("/api/v1/designs/generate-simple", web::post().to(generate_simple)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_generates_design_and_mockups() {
        let (state, _dir) = app_state(RecordingEditor::returning_png(40, 60), false);
        let app = service!(state);

        let req = post(&[
            ("dogImage", Part::File(png_bytes(50, 50, [200, 100, 0, 255]))),
            ("jerseyImage", Part::File(png_bytes(80, 100, [0, 0, 200, 255]))),
            ("productId", Part::Text("8123")),
            ("variantId", Part::Text("  ")),
            ("designPosY", Part::Text("-0.2")),
        ])
        .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["success"], true);
        assert!(body["designUrl"].as_str().unwrap().starts_with("https://cdn.example.com/design-8123-"));
        assert!(body["mockupUrl"].as_str().unwrap().contains("/mockup-8123-"));
        assert!(body["giftMockupUrl"].as_str().unwrap().contains("/gift-mockup-8123-"));
        assert_eq!(body["mockupUrls"].as_array().unwrap().len(), 2);
        assert_eq!(body["productId"], "8123");
        assert!(body["variantId"].is_null());
    }

    #[actix_web::test]
    async fn test_missing_upload_is_bad_request() {
        let (state, _dir) = app_state(RecordingEditor::returning_png(8, 8), false);
        let app = service!(state);

        let req = post(&[("dogImage", Part::File(png_bytes(8, 8, [0, 0, 0, 255])))]).to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], INVALID_INPUT);
        assert_eq!(body["error"]["message"], "Both dogImage and jerseyImage are required");
        assert!(body["error"].get("details").is_none());
    }

    #[actix_web::test]
    async fn test_non_numeric_placement_is_bad_request() {
        let (state, _dir) = app_state(RecordingEditor::returning_png(8, 8), false);
        let app = service!(state);

        let req = post(&[
            ("dogImage", Part::File(png_bytes(8, 8, [0, 0, 0, 255]))),
            ("jerseyImage", Part::File(png_bytes(8, 8, [0, 0, 0, 255]))),
            ("designScale", Part::Text("large")),
        ])
        .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["error"]["message"], "designScale must be a number");
    }

    #[actix_web::test]
    async fn test_generation_failure_exposes_details_in_debug() {
        let (state, _dir) = app_state(RecordingEditor::new(EditOutcome::Status(503)), true);
        let app = service!(state);

        let req = post(&[
            ("dogImage", Part::File(png_bytes(8, 8, [0, 0, 0, 255]))),
            ("jerseyImage", Part::File(png_bytes(8, 8, [0, 0, 0, 255]))),
        ])
        .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["error"]["code"], GENERATION_FAILED);
        assert_eq!(body["error"]["message"], "Design generation failed");
        assert!(body["error"]["details"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("designScale", None).unwrap(), None);
        assert_eq!(parse_number("designScale", Some("0.45".to_string())).unwrap(), Some(0.45));
        assert!(matches!(
            parse_number("designPosX", Some("left".to_string())),
            Err(FormError::InvalidNumber { field: "designPosX" })
        ));
    }
}
