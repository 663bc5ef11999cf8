//! arfind-pipeline: Pure connected-component detection pipeline (sans-IO).
//!
//! Finds image regions whose bounding-box aspect ratio matches a target
//! through:
//! Otsu binarization -> cross erosion -> connected-component labeling ->
//! aspect-ratio filtering, with optional rendering of the results.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! rasters and returns structured data. Loading and saving image files
//! lives in `arfind-io`.

pub mod diagnostics;
pub mod grayscale;
pub mod label;
pub mod morphology;
pub mod pipeline;
pub mod render;
pub mod shape;
pub mod threshold;
pub mod types;

pub use label::Connectivity;
pub use pipeline::Pipeline;
pub use render::{BoxStyle, render};
pub use threshold::Polarity;
pub use types::{
    BinaryMask, BoundingBox, DetectConfig, Dimensions, GrayImage, PipelineError, RgbImage,
    ShapeCriteria, StagedResult,
};

/// Find the bounding boxes of components matching `config`.
///
/// Boxes are returned in label order (raster order of each component's
/// first pixel), so identical inputs always produce identical output.
/// An image with no matching components yields an empty vector.
///
/// # Pipeline steps
///
/// 1. Otsu binarization
/// 2. One erosion pass with a 3x3 cross
/// 3. Connected-component labeling
/// 4. Aspect-ratio and minimum-size filter
/// 5. Optional extent limits
///
/// # Errors
///
/// Returns [`PipelineError::InvalidArgument`] if `config` is invalid.
/// Returns [`PipelineError::InvalidInput`] if the image has zero area.
/// Returns [`PipelineError::InvalidState`] if a degenerate box reaches
/// the filter.
pub fn detect(image: &GrayImage, config: &DetectConfig) -> Result<Vec<BoundingBox>, PipelineError> {
    Ok(Pipeline::new(image, config.clone())?
        .binarize()?
        .erode()
        .label()?
        .filter()?
        .into_retained())
}

/// Like [`detect`], for a raster whose pixel layout is only known at
/// runtime.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if `image` is not an 8-bit
/// single-channel raster, plus everything [`detect`] returns.
pub fn detect_raster(
    image: &image::DynamicImage,
    config: &DetectConfig,
) -> Result<Vec<BoundingBox>, PipelineError> {
    detect(grayscale::single_channel(image)?, config)
}

/// Run the pipeline and keep every intermediate result.
///
/// # Errors
///
/// Same as [`detect`].
pub fn detect_staged(
    image: &GrayImage,
    config: &DetectConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(image, config.clone())?
        .binarize()?
        .erode()
        .label()?
        .filter()?
        .into_result())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Dark page with a bright 12x24 panel.
    fn panel_page() -> GrayImage {
        GrayImage::from_fn(80, 80, |x, y| {
            let inside = (20..32).contains(&x) && (30..54).contains(&y);
            image::Luma([if inside { 240 } else { 12 }])
        })
    }

    fn loose_config() -> DetectConfig {
        DetectConfig {
            shape: ShapeCriteria {
                target_ratio: 0.45,
                tolerance: 0.1,
                min_width: 5,
                min_height: 5,
            },
            ..DetectConfig::default()
        }
    }

    #[test]
    fn detect_finds_panel() {
        let boxes = detect(&panel_page(), &loose_config()).unwrap();
        // Erosion trims one pixel from each side: 10x22.
        assert_eq!(boxes, vec![BoundingBox::new(21, 31, 31, 53)]);
    }

    #[test]
    fn detect_zero_area_image() {
        let result = detect(&GrayImage::new(0, 0), &DetectConfig::default());
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn detect_uniform_bright_image_is_one_block() {
        let img = GrayImage::from_pixel(20, 40, image::Luma([200]));
        let config = DetectConfig {
            shape: ShapeCriteria {
                target_ratio: 0.5,
                tolerance: 0.2,
                min_width: 1,
                min_height: 1,
            },
            ..DetectConfig::default()
        };
        // Erosion strips the border row and column on every side.
        assert_eq!(
            detect(&img, &config).unwrap(),
            vec![BoundingBox::new(1, 1, 19, 39)]
        );
    }

    #[test]
    fn detect_uniform_black_image_is_empty() {
        let img = GrayImage::from_pixel(30, 30, image::Luma([0]));
        assert!(detect(&img, &loose_config()).unwrap().is_empty());
    }

    #[test]
    fn detect_raster_accepts_luma() {
        let img = image::DynamicImage::ImageLuma8(panel_page());
        assert_eq!(detect_raster(&img, &loose_config()).unwrap().len(), 1);
    }

    #[test]
    fn detect_raster_rejects_rgb() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(10, 10));
        assert!(matches!(
            detect_raster(&img, &loose_config()),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn dark_polarity_finds_dark_panel() {
        let page = panel_page();
        let inverted = GrayImage::from_fn(80, 80, |x, y| {
            image::Luma([255 - page.get_pixel(x, y).0[0]])
        });
        let config = DetectConfig {
            polarity: Polarity::Dark,
            ..loose_config()
        };
        assert_eq!(
            detect(&inverted, &config).unwrap(),
            vec![BoundingBox::new(21, 31, 31, 53)]
        );
    }

    #[test]
    fn staged_matches_detect() {
        let img = panel_page();
        let staged = detect_staged(&img, &loose_config()).unwrap();
        assert_eq!(staged.retained, detect(&img, &loose_config()).unwrap());
        assert!((13..=240).contains(&staged.threshold));
    }
}
