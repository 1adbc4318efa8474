//! Shopify Admin API client for attaching mockups as product media
//!
//! API Docs: https://shopify.dev/docs/api/admin-graphql/latest/mutations/productCreateMedia

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::StorefrontSettings;
use super::traits::{ProviderError, ProviderResult, Storefront};

const PRODUCT_CREATE_MEDIA: &str = r#"
mutation productCreateMedia($productId: ID!, $media: [CreateMediaInput!]!) {
  productCreateMedia(productId: $productId, media: $media) {
    media {
      ... on MediaImage {
        id
        image {
          url
        }
      }
    }
    mediaUserErrors {
      field
      message
    }
  }
}
"#;

const MEDIA_ALT_TEXT: &str = "AI-generated mockup";

/// Shopify Admin GraphQL client
pub struct ShopifyClient {
    http_client: reqwest::Client,
    settings: StorefrontSettings,
    base_url: String,
}

impl ShopifyClient {
    /// Create a client for `https://{store_domain}`
    pub fn new(settings: &StorefrontSettings) -> Result<Self, reqwest::Error> {
        let base_url = format!("https://{}", settings.store_domain.trim_end_matches('/'));
        Self::with_base_url(settings, base_url)
    }

    /// Create a client against an explicit origin
    pub fn with_base_url(settings: &StorefrontSettings, base_url: String) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(ShopifyClient {
            http_client,
            settings: settings.clone(),
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/admin/api/{}/graphql.json", self.base_url, self.settings.api_version)
    }
}

/// Collect GraphQL `errors` and `mediaUserErrors` into one message
fn response_errors(body: &Value) -> Option<String> {
    let mut messages = Vec::new();

    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
        messages.push(errors.to_string());
    }

    let user_errors = body
        .pointer("/data/productCreateMedia/mediaUserErrors")
        .and_then(Value::as_array);
    for err in user_errors.into_iter().flatten() {
        let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        messages.push(message.to_string());
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[async_trait]
impl Storefront for ShopifyClient {
    async fn attach_product_image(&self, product_id: &str, image_url: &str) -> ProviderResult<()> {
        if self.settings.access_token.is_empty() || self.settings.store_domain.is_empty() {
            return Err(ProviderError::NotConfigured(
                "storefront.access_token / storefront.store_domain not set".to_string(),
            ));
        }

        let body = json!({
            "query": PRODUCT_CREATE_MEDIA,
            "variables": {
                "productId": format!("gid://shopify/Product/{}", product_id),
                "media": [{
                    "originalSource": image_url,
                    "mediaContentType": "IMAGE",
                    "alt": MEDIA_ALT_TEXT,
                }]
            }
        });

        debug!(product_id = product_id, "Attaching mockup to Shopify product");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", &self.settings.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(message) = response_errors(&payload) {
            warn!(product_id = product_id, errors = %message, "Shopify rejected product media");
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        info!(product_id = product_id, "Mockup attached to Shopify product");
        Ok(())
    }
}
