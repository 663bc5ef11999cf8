//! Single-channel input handling.
//!
//! Detection only runs on one intensity channel. [`single_channel`]
//! accepts an already-grayscale raster and rejects everything else;
//! [`luminance`] is the explicit conversion callers use when they
//! want to detect on a colour image anyway.

use image::{DynamicImage, GrayImage};

use crate::types::PipelineError;

/// Borrow the grayscale buffer of an 8-bit single-channel raster.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the raster has any other
/// pixel layout (colour, alpha, or 16-bit and float channels).
pub fn single_channel(image: &DynamicImage) -> Result<&GrayImage, PipelineError> {
    match image {
        DynamicImage::ImageLuma8(gray) => Ok(gray),
        other => Err(PipelineError::InvalidInput(format!(
            "expected a single-channel 8-bit image, got {:?} with {} channels",
            other.color(),
            other.color().channel_count()
        ))),
    }
}

/// Convert any raster to 8-bit grayscale.
///
/// Uses the `image` crate's luma conversion (Rec. 709 weights on the
/// RGB channels, alpha discarded).
#[must_use = "returns the grayscale image"]
pub fn luminance(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
