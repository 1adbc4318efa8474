//! Image source resolution
//!
//! Turns a [`SourceSpec`] into a decoded [`ImageAsset`]. Every error carries
//! the caller's label so the pipeline can tell which input was at fault.

use bytes::Bytes;
use futures::StreamExt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::FetchSettings;
use crate::domain::{truncate, SourceSpec};
use super::asset::{AssetError, ImageAsset};

/// Image fetch errors, tagged with the input label
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("[{label}] URL is empty")]
    EmptyUrl { label: String },

    #[error("[{label}] URL must start with http/https: {url}")]
    InvalidUrl { label: String, url: String },

    #[error("[{label}] fetch failed: {source}")]
    Request {
        label: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{label}] URL not loadable ({status})")]
    Status { label: String, status: u16 },

    #[error("[{label}] image too large (> {limit} bytes)")]
    TooLarge { label: String, limit: u64 },

    #[error("[{label}] could not read {}: {source}", .path.display())]
    Read {
        label: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[{label}] image could not be decoded: {source}")]
    Decode {
        label: String,
        #[source]
        source: AssetError,
    },

    #[error("[{label}] could not decode {}: {source}", .path.display())]
    DecodeFile {
        label: String,
        path: PathBuf,
        #[source]
        source: AssetError,
    },
}

impl FetchError {
    /// Label of the input that failed
    pub fn label(&self) -> &str {
        match self {
            FetchError::EmptyUrl { label }
            | FetchError::InvalidUrl { label, .. }
            | FetchError::Request { label, .. }
            | FetchError::Status { label, .. }
            | FetchError::TooLarge { label, .. }
            | FetchError::Read { label, .. }
            | FetchError::Decode { label, .. }
            | FetchError::DecodeFile { label, .. } => label,
        }
    }
}

/// Resolves remote, local and in-memory images into normalized assets
#[derive(Clone)]
pub struct ImageFetcher {
    http_client: reqwest::Client,
    max_bytes: u64,
}

impl ImageFetcher {
    /// Create a fetcher with the configured timeout, user agent and size cap
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(ImageFetcher {
            http_client,
            max_bytes: settings.max_bytes,
        })
    }

    /// Load and normalize an image
    #[instrument(skip(self, source), fields(source = %source))]
    pub async fn fetch(&self, source: &SourceSpec, label: &str) -> Result<ImageAsset, FetchError> {
        let local_path = match source {
            SourceSpec::Local(path) => Some(path),
            _ => None,
        };

        let bytes = match source {
            SourceSpec::Remote(url) => self.download(url, label).await?,
            SourceSpec::Local(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|source| FetchError::Read {
                    label: label.to_string(),
                    path: path.clone(),
                    source,
                })?,
            SourceSpec::InMemory(bytes) => bytes.clone(),
        };

        let asset = ImageAsset::decode_blocking(bytes)
            .await
            .map_err(|err| match local_path {
                Some(path) => FetchError::DecodeFile {
                    label: label.to_string(),
                    path: path.clone(),
                    source: err,
                },
                None => FetchError::Decode {
                    label: label.to_string(),
                    source: err,
                },
            })?;

        debug!(
            label = label,
            width = asset.width(),
            height = asset.height(),
            "Image resolved"
        );

        Ok(asset)
    }

    /// GET an http(s) URL, enforcing the size cap on header and body
    async fn download(&self, url: &str, label: &str) -> Result<Bytes, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::EmptyUrl { label: label.to_string() });
        }

        let parsed = url::Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| FetchError::InvalidUrl {
                label: label.to_string(),
                url: truncate(url, 120).to_string(),
            })?;

        let request_error = |source| FetchError::Request {
            label: label.to_string(),
            source,
        };

        let response = self
            .http_client
            .get(parsed)
            .header(reqwest::header::ACCEPT, "image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                label: label.to_string(),
                status: response.status().as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            label: label.to_string(),
            limit: self.max_bytes,
        };

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(too_large());
            }
        }

        let mut body = Vec::with_capacity(
            response.content_length().unwrap_or(0).min(self.max_bytes) as usize,
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(request_error)?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!(label = label, bytes = body.len(), "Downloaded remote image");
        Ok(Bytes::from(body))
    }
}
