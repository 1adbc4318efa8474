//! Decoded images in canonical (PNG) encoding

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageError, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;

/// Image decoding/encoding errors
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Image processing failed: {0}")]
    Image(#[from] ImageError),
    #[error("Image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Immutable decoded bitmap together with its PNG encoding
///
/// Every transform produces a new asset; nothing mutates one in place.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    image: DynamicImage,
    png: Bytes,
    width: u32,
    height: u32,
}

impl ImageAsset {
    /// Decode any supported format and normalize it to PNG
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let image = image::load_from_memory(bytes)?;
        Self::from_image(image)
    }

    /// Wrap a bitmap, producing its canonical encoding
    pub fn from_image(image: DynamicImage) -> Result<Self, ImageError> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)?;
        let (width, height) = image.dimensions();

        Ok(ImageAsset {
            image,
            png: Bytes::from(buffer),
            width,
            height,
        })
    }

    /// `decode` on the blocking thread pool
    pub async fn decode_blocking(bytes: Bytes) -> Result<Self, AssetError> {
        let asset = tokio::task::spawn_blocking(move || ImageAsset::decode(&bytes)).await??;
        Ok(asset)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Canonical PNG bytes (cheap to clone)
    pub fn png_bytes(&self) -> Bytes {
        self.png.clone()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
