//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::detect`] which returns only the retained boxes,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use arfind_pipeline::{DetectConfig, GrayImage, Pipeline, PipelineError};
//! # fn run(image: &GrayImage) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(image, DetectConfig::default())?
//!     .binarize()?
//!     .erode()
//!     .label()?
//!     .filter()?
//!     .into_result();
//!
//! println!("{} of {} components kept", staged.retained.len(), staged.components.len());
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates.

use crate::label::label;
use crate::morphology::erode;
use crate::shape::{filter, filter_by_extent};
use crate::threshold::binarize;
use crate::types::{
    BinaryMask, BoundingBox, DetectConfig, Dimensions, GrayImage, PipelineError, StagedResult,
};

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Validate `config` and wrap `image` in the first stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the configuration
    /// fails [`DetectConfig::validate`].
    pub fn new(image: &GrayImage, config: DetectConfig) -> Result<Pending<'_>, PipelineError> {
        config.validate()?;
        Ok(Pending { config, image })
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .binarize() to continue"]
pub struct Pending<'a> {
    config: DetectConfig,
    image: &'a GrayImage,
}

impl Pending<'_> {
    /// The configuration this run uses.
    #[must_use]
    pub const fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Threshold the image and advance to [`Thresholded`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the image has zero area.
    pub fn binarize(self) -> Result<Thresholded, PipelineError> {
        let out = binarize(self.image, self.config.polarity)?;
        Ok(Thresholded {
            config: self.config,
            dimensions: out.mask.dimensions(),
            threshold: out.threshold,
            binary: out.mask,
        })
    }
}

// ─────────────────────── Stage 1: Thresholded ────────────────────────

/// Binarization is complete.
#[must_use = "pipeline stages are consumed by advancing; call .erode() to continue"]
pub struct Thresholded {
    config: DetectConfig,
    dimensions: Dimensions,
    threshold: u8,
    binary: BinaryMask,
}

impl Thresholded {
    /// The threshold that produced the mask.
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// The binarized mask.
    #[must_use]
    pub const fn binary(&self) -> &BinaryMask {
        &self.binary
    }

    /// Apply one erosion pass and advance to [`Eroded`].
    pub fn erode(self) -> Eroded {
        let eroded = erode(&self.binary);
        tracing::debug!(
            before = self.binary.foreground_count(),
            after = eroded.foreground_count(),
            "eroded"
        );
        Eroded { prev: self, eroded }
    }
}

// ───────────────────────── Stage 2: Eroded ───────────────────────────

/// Morphological cleanup is complete.
#[must_use = "pipeline stages are consumed by advancing; call .label() to continue"]
pub struct Eroded {
    prev: Thresholded,
    eroded: BinaryMask,
}

impl Eroded {
    /// The binarized mask before erosion.
    #[must_use]
    pub const fn binary(&self) -> &BinaryMask {
        &self.prev.binary
    }

    /// The mask after erosion.
    #[must_use]
    pub const fn eroded(&self) -> &BinaryMask {
        &self.eroded
    }

    /// Extract connected components and advance to [`Labeled`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the mask cannot be
    /// labeled.
    pub fn label(self) -> Result<Labeled, PipelineError> {
        let components = label(&self.eroded, self.prev.config.connectivity)?;
        Ok(Labeled {
            prev: self,
            components,
        })
    }
}

// ───────────────────────── Stage 3: Labeled ──────────────────────────

/// Component extraction is complete.
#[must_use = "pipeline stages are consumed by advancing; call .filter() to continue"]
pub struct Labeled {
    prev: Eroded,
    components: Vec<BoundingBox>,
}

impl Labeled {
    /// Every component's bounding box, in label order.
    #[must_use]
    pub fn components(&self) -> &[BoundingBox] {
        &self.components
    }

    /// Apply the shape filter (and extent limits, when configured) and
    /// advance to [`Filtered`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] for invalid criteria
    /// and [`PipelineError::InvalidState`] for a degenerate box.
    pub fn filter(self) -> Result<Filtered, PipelineError> {
        let config = &self.prev.prev.config;
        let shaped = filter(&self.components, &config.shape)?;
        let shape_matched = shaped.len();
        let retained = if config.has_extent_limits() {
            filter_by_extent(&shaped, config.min_extent, config.max_extent)
        } else {
            shaped
        };
        Ok(Filtered {
            prev: self,
            shape_matched,
            retained,
        })
    }
}

// ───────────────────────── Stage 4: Filtered ─────────────────────────

/// All detection stages are complete.
#[must_use = "call .into_result() to obtain the staged result"]
pub struct Filtered {
    prev: Labeled,
    shape_matched: usize,
    retained: Vec<BoundingBox>,
}

impl Filtered {
    /// Boxes that passed every filter, in label order.
    #[must_use]
    pub fn retained(&self) -> &[BoundingBox] {
        &self.retained
    }

    /// How many components passed the shape filter, before any extent
    /// limits were applied.
    #[must_use]
    pub const fn shape_matched(&self) -> usize {
        self.shape_matched
    }

    /// Source image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.prev.prev.prev.dimensions
    }

    /// Consume the pipeline and return only the retained boxes.
    #[must_use]
    pub fn into_retained(self) -> Vec<BoundingBox> {
        self.retained
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let Labeled { prev, components } = self.prev;
        let Eroded { prev, eroded } = prev;
        StagedResult {
            threshold: prev.threshold,
            binary: prev.binary,
            eroded,
            components,
            retained: self.retained,
            dimensions: prev.dimensions,
        }
    }
}
