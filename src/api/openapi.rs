//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{
    health::HealthResponse,
    generate::{ApiError, ErrorResponse, GenerateSimpleForm, GenerateSimpleResponse},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Jersey-Forge API",
        version = "1.0.0",
        description = "AI pet jersey design generation with mockup previews",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "designs", description = "Design and mockup generation endpoints")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::generate::generate_simple,
    ),
    components(
        schemas(
            HealthResponse,
            GenerateSimpleForm,
            GenerateSimpleResponse,
            ErrorResponse,
            ApiError,
        )
    )
)]
pub struct ApiDoc;
