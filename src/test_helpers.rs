//! Shared fixtures for unit tests

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

use crate::engine::ImageAsset;

/// Solid RGBA image encoded as PNG
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)
        .unwrap();
    buffer
}

/// Solid RGB image encoded as JPEG
pub fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Jpeg(90))
        .unwrap();
    buffer
}

pub fn rgba_asset(width: u32, height: u32, color: [u8; 4]) -> ImageAsset {
    ImageAsset::from_image(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba(color),
    )))
    .unwrap()
}

pub fn rgb_asset(width: u32, height: u32, color: [u8; 3]) -> ImageAsset {
    ImageAsset::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb(color),
    )))
    .unwrap()
}

/// Write a solid PNG into `dir` and return its path
pub fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32, color: [u8; 4]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height, color)).unwrap();
    path
}

/// Canned outcome of a [`RecordingEditor`] call
#[derive(Debug, Clone)]
pub enum EditOutcome {
    Image(Vec<u8>),
    Status(u16),
    NoImage,
}

/// Image-edit double that records every request
pub struct RecordingEditor {
    outcome: EditOutcome,
    requests: std::sync::Mutex<Vec<crate::providers::ImageEditRequest>>,
}

impl RecordingEditor {
    pub fn new(outcome: EditOutcome) -> Self {
        RecordingEditor {
            outcome,
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Editor returning a solid PNG of the given size
    pub fn returning_png(width: u32, height: u32) -> Self {
        Self::new(EditOutcome::Image(png_bytes(width, height, [20, 120, 40, 255])))
    }

    pub fn requests(&self) -> Vec<crate::providers::ImageEditRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::providers::ImageEditService for RecordingEditor {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn edit(
        &self,
        request: crate::providers::ImageEditRequest,
    ) -> crate::providers::ProviderResult<bytes::Bytes> {
        self.requests.lock().unwrap().push(request);
        match &self.outcome {
            EditOutcome::Image(bytes) => Ok(bytes::Bytes::from(bytes.clone())),
            EditOutcome::Status(status) => Err(crate::providers::ProviderError::ApiError {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            EditOutcome::NoImage => Err(crate::providers::ProviderError::MissingImage),
        }
    }
}
