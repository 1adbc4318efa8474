//! Configuration module for the design service

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;
use std::time::Duration;

/// Prompt sent to the image-edit service when the request does not carry one.
pub const DEFAULT_PROMPT: &str = "Use the images as follows: image 1 = reference of the finished jersey design \
(dog in a stadium, standing full figure). Image 2 = photo of the customer's dog (use only this face/head). \
Image 3 = photo of the customer's empty jersey. Task: create a new, print-ready football jersey design in the \
style of image 1. Replace the dog from image 1 with the dog from image 2 so that the dog is fully visible from \
head to paws, not cropped, with a similar pose, proportions and perspective as in image 1. The dog wears the \
jersey from image 3 (copy colours, stripes, logos and cut as closely as possible). The framing should closely \
match image 1: dog centred in the foreground, stadium with fans in the background. Do not crop the head or the \
paws. No close-up portrait, the whole figure. The background follows the style of image 1 (football stadium \
with fans) without new motifs that distract from the dog. Deliver a full-bleed jersey image with an opaque \
background (no transparency), suitable for printing and mockups.";

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub generation: GenerationSettings,
    pub assets: AssetSettings,
    pub placement: PlacementSettings,
    pub mockups: MockupSettings,
    pub fetch: FetchSettings,
    pub uploads: UploadSettings,
    pub r2: R2Settings,
    pub storefront: StorefrontSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Expose error chains in API responses
    pub debug: bool,
}

/// Image-edit service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub size: String,
    pub quality: String,
    pub input_fidelity: String,
    pub background: String,
    pub output_format: String,
    pub timeout_secs: u64,
    pub prompt: String,
}

/// Local image assets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub reference_path: PathBuf,
    pub mockup_template_path: PathBuf,
    pub use_mockup_template: bool,
}

/// Default design placement on mockup bases
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    pub scale: f64,
    pub pos_x: f64,
    pub pos_y: f64,
}

/// Mockup variants rendered per request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockupSettings {
    /// Template type of the secondary gift mockup; empty disables it
    pub gift_variant_type: Option<String>,
}

/// Remote image download limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_bytes: u64,
    pub user_agent: String,
}

/// Inbound upload limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_file_bytes: usize,
}

/// Cloudflare R2 configuration for uploading generated artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct R2Settings {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub public_base_url: String,
    pub timeout_secs: u64,
}

/// Shopify product media attachment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorefrontSettings {
    pub enabled: bool,
    pub store_domain: String,
    pub access_token: String,
    pub api_version: String,
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with FORGE_, sections split by `__`)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // FORGE_R2__BUCKET_NAME, FORGE_PLACEMENT__SCALE, ...
            .add_source(
                Environment::with_prefix("FORGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration problems that will make requests fail later on
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.generation.api_key.trim().is_empty() {
            warnings.push("generation.api_key is not set; design generation will fail".to_string());
        }

        let r2 = &self.r2;
        if r2.account_id.is_empty() || r2.access_key_id.is_empty() || r2.secret_access_key.is_empty() {
            warnings.push("R2 account id / access key / secret are not set; uploads will fail".to_string());
        }
        if r2.bucket_name.is_empty() {
            warnings.push("r2.bucket_name is not set; uploads will fail".to_string());
        }
        if r2.public_base_url.is_empty() {
            warnings.push("r2.public_base_url is not set; uploads will fail".to_string());
        }

        if self.storefront.enabled
            && (self.storefront.store_domain.is_empty() || self.storefront.access_token.is_empty())
        {
            warnings.push("storefront is enabled but store_domain / access_token are missing".to_string());
        }

        warnings
    }
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl R2Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MockupSettings {
    pub fn gift_variant(&self) -> Option<&str> {
        self.gift_variant_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workers: None,
            debug: false,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            api_key: String::new(),
            endpoint: "https://api.openai.com/v1/images/edits".to_string(),
            model: "gpt-image-1".to_string(),
            size: "1024x1536".to_string(),
            quality: "high".to_string(),
            input_fidelity: "high".to_string(),
            background: "opaque".to_string(),
            output_format: "png".to_string(),
            timeout_secs: 180,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        AssetSettings {
            reference_path: PathBuf::from("./assets/reference.png"),
            mockup_template_path: PathBuf::from("./assets/mockup-template.png"),
            use_mockup_template: true,
        }
    }
}

impl Default for PlacementSettings {
    fn default() -> Self {
        PlacementSettings {
            scale: 0.6,
            pos_x: 0.0,
            pos_y: -0.1,
        }
    }
}

impl Default for MockupSettings {
    fn default() -> Self {
        MockupSettings {
            gift_variant_type: Some("tasse".to_string()),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            timeout_secs: 12,
            max_bytes: 15 * 1024 * 1024,
            user_agent: format!("jersey-forge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for R2Settings {
    fn default() -> Self {
        R2Settings {
            account_id: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket_name: "two-picture-upload-ai".to_string(),
            public_base_url: String::new(),
            timeout_secs: 60,
        }
    }
}

impl Default for StorefrontSettings {
    fn default() -> Self {
        StorefrontSettings {
            enabled: false,
            store_domain: String::new(),
            access_token: String::new(),
            api_version: "2025-04".to_string(),
        }
    }
}
