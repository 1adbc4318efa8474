//! Cloudflare R2 storage client for generated artifacts
//!
//! R2 is S3-compatible, so we use aws-sdk-s3 with custom endpoint configuration.
//! Artifacts are stored flat under their filename and served from the
//! bucket's public base URL.

use async_trait::async_trait;
use aws_sdk_s3::{
    Client as S3Client,
    config::{BehaviorVersion, Builder, Credentials, Region, timeout::TimeoutConfig},
    primitives::ByteStream,
};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, info, instrument};

use crate::config::R2Settings;
use super::{ArtifactStore, StorageError};

/// Characters left unescaped by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Cloudflare R2 client for artifact uploads
#[derive(Clone)]
pub struct R2Client {
    client: S3Client,
    settings: R2Settings,
}

impl R2Client {
    /// Create a new R2 client from settings
    ///
    /// Missing credentials are not an error here; uploads report them.
    pub fn new(settings: &R2Settings) -> Self {
        // R2 endpoint format: https://{account_id}.r2.cloudflarestorage.com
        let endpoint = format!(
            "https://{}.r2.cloudflarestorage.com",
            settings.account_id
        );

        debug!("Creating R2 client with endpoint: {}", endpoint);

        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None, // session token
            None, // expiry
            "r2-static-credentials",
        );

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&endpoint)
            .region(Region::new("auto")) // R2 uses "auto" region
            .credentials_provider(credentials)
            .force_path_style(true) // Required for R2
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(settings.timeout())
                    .build(),
            )
            .build();

        R2Client {
            client: S3Client::from_conf(config),
            settings: settings.clone(),
        }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.settings.bucket_name
    }

    fn ensure_configured(&self) -> Result<(), StorageError> {
        let s = &self.settings;
        if s.account_id.is_empty() || s.access_key_id.is_empty() || s.secret_access_key.is_empty() {
            return Err(StorageError::NotConfigured(
                "r2.account_id / r2.access_key_id / r2.secret_access_key".to_string(),
            ));
        }
        if s.bucket_name.is_empty() {
            return Err(StorageError::NotConfigured("r2.bucket_name".to_string()));
        }
        if s.public_base_url.is_empty() {
            return Err(StorageError::NotConfigured("r2.public_base_url".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for R2Client {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, data: Bytes, key: &str, content_type: &str) -> Result<String, StorageError> {
        self.ensure_configured()?;

        let size = data.len();
        debug!("Uploading {} bytes to R2: {}", size, key);

        self.client
            .put_object()
            .bucket(&self.settings.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{:?}", e)))?;

        info!("Uploaded to R2: {} ({} bytes)", key, size);

        Ok(public_url(&self.settings.public_base_url, key))
    }
}

/// Public URL of `key` under `base` (trailing slash ignored)
pub fn public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        utf8_percent_encode(key, URI_COMPONENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("https://pub.example.r2.dev/", "design-123-1700000000000.png"),
            "https://pub.example.r2.dev/design-123-1700000000000.png"
        );
        assert_eq!(
            public_url("https://cdn.example.com", "mockup-a/b c-1.png"),
            "https://cdn.example.com/mockup-a%2Fb%20c-1.png"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails_before_network() {
        let client = R2Client::new(&R2Settings::default());
        let err = client
            .put(Bytes::from_static(b"png"), "design-x-1.png", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured(_)));

        let mut settings = R2Settings {
            account_id: "acc".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            ..R2Settings::default()
        };
        settings.public_base_url.clear();
        let err = R2Client::new(&settings)
            .put(Bytes::from_static(b"png"), "design-x-1.png", "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("public_base_url"));
    }
}
