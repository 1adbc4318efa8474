//! Placement of a design on a mockup base
//!
//! Placement is resolution independent: `scale` is the fraction of the base
//! width the design occupies, `pos_x`/`pos_y` shift the design's center away
//! from the base center in units of half the base width/height.

use thiserror::Error;

use crate::config::PlacementSettings;

/// Base edge assumed when a base image reports no usable dimensions
pub const DEFAULT_BASE_EDGE: u32 = 1024;

/// Placement errors
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("Scale must be greater than 0 and at most 1.0, got {0}")]
    InvalidScale(f64),
    #[error("Horizontal position must be between -1.0 and 1.0, got {0}")]
    InvalidPosX(f64),
    #[error("Vertical position must be between -1.0 and 1.0, got {0}")]
    InvalidPosY(f64),
}

/// Normalized placement of a design on a base image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    /// Design width as a fraction of the base width, in (0, 1]
    pub scale: f64,
    /// Horizontal center offset in half base widths, in [-1, 1]
    pub pos_x: f64,
    /// Vertical center offset in half base heights, in [-1, 1] (negative = up)
    pub pos_y: f64,
}

/// Per-request placement values; each present field replaces the default
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementOverrides {
    pub scale: Option<f64>,
    pub pos_x: Option<f64>,
    pub pos_y: Option<f64>,
}

/// Pixel rectangle of the resized design on the base canvas
///
/// `left`/`top` may be negative or lie past the canvas edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRect {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

impl PlacementParams {
    pub fn new(scale: f64, pos_x: f64, pos_y: f64) -> Self {
        PlacementParams { scale, pos_x, pos_y }
    }

    /// Validate the placement parameters
    pub fn validate(&self) -> Result<(), PlacementError> {
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(PlacementError::InvalidScale(self.scale));
        }
        if !self.pos_x.is_finite() || !(-1.0..=1.0).contains(&self.pos_x) {
            return Err(PlacementError::InvalidPosX(self.pos_x));
        }
        if !self.pos_y.is_finite() || !(-1.0..=1.0).contains(&self.pos_y) {
            return Err(PlacementError::InvalidPosY(self.pos_y));
        }
        Ok(())
    }

    /// Compute where a design of `design_size` lands on a base of `base_size`
    ///
    /// A zero base dimension falls back to a 1024x1024 base for the math.
    /// The design width is `round(W * scale)`, its height follows the design's
    /// aspect ratio (or equals the width when the design has no usable size).
    pub fn layout(&self, base_size: (u32, u32), design_size: (u32, u32)) -> OverlayRect {
        let (base_w, base_h) = match base_size {
            (w, h) if w > 0 && h > 0 => (w as f64, h as f64),
            _ => (DEFAULT_BASE_EDGE as f64, DEFAULT_BASE_EDGE as f64),
        };

        let width = (round_half_up(base_w * self.scale) as u32).max(1);
        let height = match design_size {
            (dw, dh) if dw > 0 && dh > 0 => {
                (round_half_up(width as f64 * dh as f64 / dw as f64) as u32).max(1)
            }
            _ => width,
        };

        let offset_x = self.pos_x * (base_w / 2.0);
        let offset_y = self.pos_y * (base_h / 2.0);

        let left = round_half_up(base_w / 2.0 - width as f64 / 2.0 + offset_x) as i64;
        let top = round_half_up(base_h / 2.0 - height as f64 / 2.0 + offset_y) as i64;

        OverlayRect { left, top, width, height }
    }
}

impl From<&PlacementSettings> for PlacementParams {
    fn from(settings: &PlacementSettings) -> Self {
        PlacementParams::new(settings.scale, settings.pos_x, settings.pos_y)
    }
}

impl PlacementOverrides {
    /// Merge field by field over `defaults`
    pub fn apply(&self, defaults: PlacementParams) -> PlacementParams {
        PlacementParams {
            scale: self.scale.unwrap_or(defaults.scale),
            pos_x: self.pos_x.unwrap_or(defaults.pos_x),
            pos_y: self.pos_y.unwrap_or(defaults.pos_y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scale.is_none() && self.pos_x.is_none() && self.pos_y.is_none()
    }
}

/// Round with halves going towards positive infinity
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
