//! Image compositing pipeline
//!
//! Places a generated design onto a mockup base using normalized placement
//! and standard source-over alpha blending.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::domain::PlacementParams;
use super::asset::ImageAsset;

/// Compositing errors
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Failed to encode composite: {0}")]
    Encode(#[from] image::ImageError),
}

/// Overlay `design` onto `base` at `placement`
///
/// The design is resized to `round(W * scale)` wide keeping its aspect ratio
/// and drawn so its center sits at the base center shifted by
/// `(pos_x * W/2, pos_y * H/2)`. Parts outside the base are clipped.
/// The output keeps the base's dimensions and alpha-ness; identical inputs
/// always give identical bytes.
pub fn composite(
    base: &ImageAsset,
    design: &ImageAsset,
    placement: &PlacementParams,
) -> Result<ImageAsset, CompositeError> {
    let rect = placement.layout(base.dimensions(), design.dimensions());

    debug!(
        base_width = base.width(),
        base_height = base.height(),
        design_width = rect.width,
        design_height = rect.height,
        left = rect.left,
        top = rect.top,
        "Calculated design position"
    );

    let mut canvas = base.image().to_rgba8();

    let (design_w, design_h) = design.dimensions();
    if design_w > 0 && design_h > 0 {
        let resized = imageops::resize(
            &design.image().to_rgba8(),
            rect.width,
            rect.height,
            FilterType::Lanczos3,
        );
        blend_over(&mut canvas, &resized, rect.left, rect.top);
    }

    let output = if base.image().color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgba8(canvas).to_rgb8().into()
    };

    Ok(ImageAsset::from_image(output)?)
}

/// Source-over blend `overlay` into `canvas` with its top-left at `(left, top)`
///
/// Rows are processed in parallel; only the visible intersection is touched.
fn blend_over(canvas: &mut RgbaImage, overlay: &RgbaImage, left: i64, top: i64) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let (overlay_w, overlay_h) = overlay.dimensions();

    let x_start = left.max(0);
    let x_end = (left + overlay_w as i64).min(canvas_w as i64);
    let y_start = top.max(0);
    let y_end = (top + overlay_h as i64).min(canvas_h as i64);

    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let row_len = canvas_w as usize * 4;
    canvas
        .par_chunks_mut(row_len)
        .enumerate()
        .skip(y_start as usize)
        .take((y_end - y_start) as usize)
        .for_each(|(y, row)| {
            let oy = (y as i64 - top) as u32;
            for x in x_start..x_end {
                let src = overlay.get_pixel((x - left) as u32, oy);

                // Skip fully transparent pixels
                if src.0[3] == 0 {
                    continue;
                }

                let i = x as usize * 4;
                let dst = Rgba([row[i], row[i + 1], row[i + 2], row[i + 3]]);
                row[i..i + 4].copy_from_slice(&blend_source_over(&dst, src).0);
            }
        });
}

/// Porter-Duff source-over on straight (non-premultiplied) alpha
fn blend_source_over(base: &Rgba<u8>, overlay: &Rgba<u8>) -> Rgba<u8> {
    let src_a = overlay.0[3] as f64 / 255.0;
    let dst_a = base.0[3] as f64 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut result = [0u8; 4];
    for i in 0..3 {
        let c = (overlay.0[i] as f64 * src_a + base.0[i] as f64 * dst_a * (1.0 - src_a)) / out_a;
        result[i] = (c + 0.5).floor().clamp(0.0, 255.0) as u8;
    }
    result[3] = (out_a * 255.0 + 0.5).floor().clamp(0.0, 255.0) as u8;

    Rgba(result)
}
