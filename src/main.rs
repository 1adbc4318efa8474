//! Jersey-Forge
//!
//! Turns a customer's pet photo and jersey photo into a print-ready jersey
//! design through an image-edit model, composites that design onto mockup
//! previews and publishes everything to Cloudflare R2.

use actix_web::{web, App, HttpServer, middleware};
use anyhow::Context;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use std::sync::Arc;

mod api;
mod config;
mod domain;
mod engine;
mod providers;
mod storage;
#[cfg(test)]
mod test_helpers;

use crate::api::middleware::Cors;
use crate::config::Settings;
use crate::engine::{ImageFetcher, PipelineOrchestrator};
use crate::providers::{OpenAiImageEditor, ShopifyClient, Storefront};
use crate::storage::R2Client;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub pipeline: Arc<PipelineOrchestrator>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jersey_forge=info,actix_web=info")),
        )
        .json()
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    info!(
        "Starting Jersey-Forge v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    for warning in settings.startup_warnings() {
        warn!("{}", warning);
    }

    let fetcher = ImageFetcher::new(&settings.fetch).context("Failed to build image fetch client")?;
    let editor = OpenAiImageEditor::new(&settings.generation).context("Failed to build image edit client")?;
    let store = R2Client::new(&settings.r2);

    let storefront: Option<Arc<dyn Storefront>> = if settings.storefront.enabled {
        let client = ShopifyClient::new(&settings.storefront).context("Failed to build storefront client")?;
        info!(store = %settings.storefront.store_domain, "Storefront image attachment enabled");
        Some(Arc::new(client))
    } else {
        None
    };

    info!(
        bucket = store.bucket(),
        templates = settings.assets.use_mockup_template,
        gift_variant = settings.mockups.gift_variant().unwrap_or("none"),
        "Pipeline configured"
    );

    let pipeline = Arc::new(PipelineOrchestrator::new(
        &settings,
        fetcher,
        Arc::new(editor),
        Arc::new(store),
        storefront,
    ));

    let workers = settings.server.workers.unwrap_or_else(num_cpus::get);

    let app_state = web::Data::new(AppState {
        settings,
        pipeline,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Cors)
            // Middleware (order matters - these wrap around Cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "jersey-forge"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
