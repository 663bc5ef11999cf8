//! Global binarization with an automatically selected threshold.
//!
//! The threshold is chosen by Otsu's method: over the 256-bin intensity
//! histogram, pick the split that maximises the between-class variance of
//! the two resulting pixel populations. [`otsu_threshold`] works on the
//! histogram alone so it can be tested without any image data.
//!
//! This is step 1 in the pipeline: `GrayImage` in, [`BinaryMask`] out.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::{BinaryMask, PipelineError};

/// Which side of the threshold is foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    /// Pixels at or above the threshold are foreground.
    #[default]
    Light,
    /// Pixels below the threshold are foreground (dark ink on light paper).
    Dark,
}

impl Polarity {
    /// Classify a single intensity against `threshold`.
    #[must_use]
    pub const fn is_foreground(self, value: u8, threshold: u8) -> bool {
        match self {
            Self::Light => value >= threshold,
            Self::Dark => value < threshold,
        }
    }
}

/// Output of [`binarize`]: the mask and the threshold that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binarized {
    /// Two-level mask with the same dimensions as the source image.
    pub mask: BinaryMask,
    /// Threshold applied: the Otsu split, or [`FLAT_THRESHOLD`] when the
    /// histogram has fewer than two populated intensities.
    pub threshold: u8,
}

/// Threshold applied when no Otsu split exists: every non-zero pixel is
/// foreground for [`Polarity::Light`], only zero pixels for
/// [`Polarity::Dark`].
pub const FLAT_THRESHOLD: u8 = 1;

/// Count pixels per intensity value.
#[must_use]
pub fn histogram(image: &GrayImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in image.as_raw() {
        hist[usize::from(v)] += 1;
    }
    hist
}

/// Select the Otsu threshold for a 256-bin histogram.
///
/// The returned `t` splits intensities into `[0, t)` and `[t, 255]`; it
/// maximises `w_b * w_f * (mu_b - mu_f)^2`. Ties resolve to the lowest
/// `t`. Returns `None` when no split leaves both classes non-empty
/// (an empty histogram or a single populated intensity).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn otsu_threshold(hist: &[u32; 256]) -> Option<u8> {
    let total: u64 = hist.iter().map(|&c| u64::from(c)).sum();
    let weighted_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * f64::from(c))
        .sum();

    let mut best: Option<(u8, f64)> = None;
    let mut count_bg: u64 = 0;
    let mut sum_bg = 0.0;

    for t in 1u8..=255 {
        let below = usize::from(t - 1);
        count_bg += u64::from(hist[below]);
        sum_bg += below as f64 * f64::from(hist[below]);

        let count_fg = total - count_bg;
        if count_bg == 0 || count_fg == 0 {
            continue;
        }

        let w_b = count_bg as f64;
        let w_f = count_fg as f64;
        let mean_bg = sum_bg / w_b;
        let mean_fg = (weighted_total - sum_bg) / w_f;
        let diff = mean_bg - mean_fg;
        let between = w_b * w_f * diff * diff;

        if best.is_none_or(|(_, v)| between > v) {
            best = Some((t, between));
        }
    }

    best.map(|(t, _)| t)
}

/// Binarize a grayscale image with an automatically chosen threshold.
///
/// A single-intensity image has no Otsu split; it is thresholded at
/// [`FLAT_THRESHOLD`] instead, so a uniform non-zero image becomes one
/// foreground block.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image has zero area.
pub fn binarize(image: &GrayImage, polarity: Polarity) -> Result<Binarized, PipelineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "cannot binarize a {width}x{height} image"
        )));
    }

    let threshold = otsu_threshold(&histogram(image)).unwrap_or_else(|| {
        tracing::debug!(width, height, threshold = FLAT_THRESHOLD, "flat histogram");
        FLAT_THRESHOLD
    });

    let mask = BinaryMask::from_fn(width, height, |x, y| {
        polarity.is_foreground(image.get_pixel(x, y).0[0], threshold)
    });
    tracing::debug!(threshold, ?polarity, "binarized");

    Ok(Binarized { mask, threshold })
}
