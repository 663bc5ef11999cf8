//! Shared types for the arfind detection pipeline.

use serde::{Deserialize, Serialize};

use crate::label::Connectivity;
use crate::threshold::Polarity;

/// Re-export `GrayImage` so downstream crates can hand detection input
/// to the pipeline without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can render results
/// without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle enclosing one connected region.
///
/// `x_max` and `y_max` are exclusive, so a single pixel at `(3, 4)` has
/// the box `3..4 x 4..5`. Boxes produced by the labeler always satisfy
/// `x_min < x_max` and `y_min < y_max`; boxes built by hand are checked
/// again by the shape filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Leftmost column (inclusive).
    pub x_min: u32,
    /// Topmost row (inclusive).
    pub y_min: u32,
    /// One past the rightmost column.
    pub x_max: u32,
    /// One past the bottom row.
    pub y_max: u32,
}

impl BoundingBox {
    /// Create a new bounding box from its corner coordinates.
    #[must_use]
    pub const fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Box width in pixels. Zero for a degenerate box.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    /// Box height in pixels. Zero for a degenerate box.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Width divided by height, or `None` when the height is zero.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        let height = self.height();
        (height > 0).then(|| f64::from(self.width()) / f64::from(height))
    }

    /// Square root of the box area.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self) -> f64 {
        (self.area() as f64).sqrt()
    }

    /// Returns `true` if `(x, y)` lies inside the box.
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }
}

/// Two-level image: `true` is foreground, `false` is background.
///
/// Pixels are stored row-major. Conversion to and from a 0/255
/// [`GrayImage`] is provided for debug export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// Create an all-background mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; pixel_len(width, height)],
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(pixel_len(width, height));
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Interpret a grayscale image as a mask: nonzero pixels are foreground.
    #[must_use]
    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            bits: image.as_raw().iter().map(|&v| v != 0).collect(),
        }
    }

    /// Render the mask as a 0/255 grayscale image.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Mask width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Mask dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Foreground state of `(x, y)`. Out-of-range coordinates are background.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[self.index(x, y)]
    }

    /// Set the foreground state of `(x, y)`. Out-of-range writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.bits[i] = value;
        }
    }

    /// Mark every pixel of `rect` as foreground, clipped to the mask.
    pub fn fill_rect(&mut self, rect: BoundingBox) {
        for y in rect.y_min..rect.y_max.min(self.height) {
            for x in rect.x_min..rect.x_max.min(self.width) {
                self.set(x, y, true);
            }
        }
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> u64 {
        self.bits.iter().map(|&b| u64::from(b)).sum()
    }

    /// Row-major view of the pixel states.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn pixel_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Acceptance window for the shape filter.
///
/// A box passes when its aspect ratio lies strictly inside
/// `(target_ratio - tolerance, target_ratio + tolerance)` and both of its
/// sides meet the minimums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeCriteria {
    /// Desired `width / height`.
    pub target_ratio: f64,
    /// Half-width of the open acceptance interval around `target_ratio`.
    pub tolerance: f64,
    /// Minimum box width in pixels (inclusive).
    pub min_width: u32,
    /// Minimum box height in pixels (inclusive).
    pub min_height: u32,
}

impl ShapeCriteria {
    /// Default target aspect ratio (width / height).
    pub const DEFAULT_TARGET_RATIO: f64 = 0.5;
    /// Default aspect ratio tolerance.
    pub const DEFAULT_TOLERANCE: f64 = 0.1;
    /// Default minimum box width.
    pub const DEFAULT_MIN_WIDTH: u32 = 50;
    /// Default minimum box height.
    pub const DEFAULT_MIN_HEIGHT: u32 = 50;

    /// Check that the ratio and tolerance are usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `target_ratio` or
    /// `tolerance` is not finite, or if `tolerance` is negative.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.target_ratio.is_finite() {
            return Err(PipelineError::InvalidArgument(format!(
                "target ratio must be finite, got {}",
                self.target_ratio
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

impl Default for ShapeCriteria {
    fn default() -> Self {
        Self {
            target_ratio: Self::DEFAULT_TARGET_RATIO,
            tolerance: Self::DEFAULT_TOLERANCE,
            min_width: Self::DEFAULT_MIN_WIDTH,
            min_height: Self::DEFAULT_MIN_HEIGHT,
        }
    }
}

/// Configuration for the detection pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Aspect ratio window and minimum side lengths.
    pub shape: ShapeCriteria,

    /// Which side of the automatic threshold counts as foreground.
    pub polarity: Polarity,

    /// Pixel adjacency used when grouping foreground pixels.
    pub connectivity: Connectivity,

    /// Drop boxes whose `sqrt(area)` is below this value.
    pub min_extent: Option<f64>,

    /// Drop boxes whose `sqrt(area)` is above this value.
    pub max_extent: Option<f64>,
}

impl DetectConfig {
    /// Check all parameters before running the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the shape criteria
    /// are invalid, an extent limit is negative or not finite, or
    /// `min_extent` exceeds `max_extent`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.shape.validate()?;
        for (name, limit) in [
            ("min_extent", self.min_extent),
            ("max_extent", self.max_extent),
        ] {
            if let Some(v) = limit
                && (!v.is_finite() || v < 0.0)
            {
                return Err(PipelineError::InvalidArgument(format!(
                    "{name} must be finite and non-negative, got {v}"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_extent, self.max_extent)
            && lo > hi
        {
            return Err(PipelineError::InvalidArgument(format!(
                "min_extent ({lo}) exceeds max_extent ({hi})"
            )));
        }
        Ok(())
    }

    /// Returns `true` if either extent limit is set.
    #[must_use]
    pub const fn has_extent_limits(&self) -> bool {
        self.min_extent.is_some() || self.max_extent.is_some()
    }
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Does not derive serde traits: the masks are raster data that callers
/// export through [`BinaryMask::to_gray_image`] when needed.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Threshold applied by the binarizer.
    pub threshold: u8,
    /// Stage 1: binarized mask.
    pub binary: BinaryMask,
    /// Stage 2: mask after one erosion pass.
    pub eroded: BinaryMask,
    /// Stage 3: every connected component, in label order.
    pub components: Vec<BoundingBox>,
    /// Stage 4: components that passed the shape filter (and the
    /// extent limits when configured).
    pub retained: Vec<BoundingBox>,
    /// Source image dimensions.
    pub dimensions: Dimensions,
}

/// Errors that can occur during detection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The image or mask is empty or has an unsupported layout.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A filter parameter is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant did not hold (e.g. a zero-height box).
    #[error("invalid state: {0}")]
    InvalidState(String),
}
