//! Pipeline diagnostics: timing and counts for each detection stage.
//!
//! [`detect_with_diagnostics`] runs the staged pipeline and records how
//! long every stage took and what it produced. Timing goes through the
//! [`Clock`] trait so this crate stays free of any platform time source;
//! the CLI supplies a `std::time::Instant` implementation.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{BoundingBox, DetectConfig, GrayImage, PipelineError, StagedResult};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: Otsu binarization.
    pub binarize: StageDiagnostics,
    /// Stage 2: cross erosion.
    pub erode: StageDiagnostics,
    /// Stage 3: connected-component labeling.
    pub label: StageDiagnostics,
    /// Stage 4: aspect-ratio filter, including extent pruning.
    pub filter: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Binarization metrics.
    Binarize {
        /// Threshold applied.
        threshold: u8,
        /// Foreground pixels in the mask.
        foreground_pixels: u64,
        /// Total pixel count.
        total_pixels: u64,
    },
    /// Erosion metrics.
    Erode {
        /// Foreground pixels before erosion.
        foreground_before: u64,
        /// Foreground pixels after erosion.
        foreground_after: u64,
    },
    /// Labeling metrics.
    Label {
        /// Number of connected components.
        component_count: usize,
        /// Pixel area of the largest component's bounding box.
        largest_box_area: u64,
    },
    /// Filtering metrics.
    Filter {
        /// Target aspect ratio.
        target_ratio: f64,
        /// Aspect ratio tolerance.
        tolerance: f64,
        /// Components considered.
        input_count: usize,
        /// Components passing the aspect-ratio and minimum-size check.
        shape_count: usize,
        /// Components dropped by the extent limits (`None` when no limit
        /// is configured).
        extent_pruned: Option<usize>,
        /// Components retained.
        retained_count: usize,
    },
}

/// High-level summary counts for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of connected components found.
    pub component_count: usize,
    /// Number of components retained.
    pub retained_count: usize,
}

/// Run the staged pipeline, timing every stage.
///
/// # Errors
///
/// Propagates any [`PipelineError`] raised by a stage.
pub fn detect_with_diagnostics<C: Clock>(
    image: &GrayImage,
    config: &DetectConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let pending = Pipeline::new(image, config.clone())?;
    let shape = pending.config().shape;
    let extent_limited = pending.config().has_extent_limits();

    let t = clock.now();
    let thresholded = pending.binarize()?;
    let binarize = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Binarize {
            threshold: thresholded.threshold(),
            foreground_pixels: thresholded.binary().foreground_count(),
            total_pixels: thresholded.binary().dimensions().pixel_count(),
        },
    };

    let t = clock.now();
    let eroded = thresholded.erode();
    let erode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Erode {
            foreground_before: eroded.binary().foreground_count(),
            foreground_after: eroded.eroded().foreground_count(),
        },
    };

    let t = clock.now();
    let labeled = eroded.label()?;
    let label = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Label {
            component_count: labeled.components().len(),
            largest_box_area: labeled
                .components()
                .iter()
                .map(BoundingBox::area)
                .max()
                .unwrap_or(0),
        },
    };

    let t = clock.now();
    let input_count = labeled.components().len();
    let filtered = labeled.filter()?;
    let duration = clock.elapsed(&t);
    let shape_count = filtered.shape_matched();
    let retained_count = filtered.retained().len();
    let filter = StageDiagnostics {
        duration,
        metrics: StageMetrics::Filter {
            target_ratio: shape.target_ratio,
            tolerance: shape.tolerance,
            input_count,
            shape_count,
            extent_pruned: extent_limited.then_some(shape_count - retained_count),
            retained_count,
        },
    };

    let staged = filtered.into_result();
    let total_duration = clock.elapsed(&start);

    let summary = PipelineSummary {
        image_width: staged.dimensions.width,
        image_height: staged.dimensions.height,
        pixel_count: staged.dimensions.pixel_count(),
        component_count: staged.components.len(),
        retained_count: staged.retained.len(),
    };

    Ok((
        staged,
        PipelineDiagnostics {
            binarize,
            erode,
            label,
            filter,
            total_duration,
            summary,
        },
    ))
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Detection Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Binarize", &self.binarize),
            ("Erode", &self.erode),
            ("Label", &self.label),
            ("Filter", &self.filter),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Components: {}  |  Retained: {}",
            self.summary.component_count, self.summary.retained_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Binarize {
            threshold,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!("threshold={threshold} foreground={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::Erode {
            foreground_before,
            foreground_after,
        } => format!("foreground {foreground_before}->{foreground_after}"),
        StageMetrics::Label {
            component_count,
            largest_box_area,
        } => format!("{component_count} components, largest box {largest_box_area} px"),
        StageMetrics::Filter {
            target_ratio,
            tolerance,
            input_count,
            shape_count,
            extent_pruned,
            retained_count,
        } => {
            let extent = extent_pruned.map_or_else(String::new, |n| format!(", extent pruned {n}"));
            format!(
                "ratio={target_ratio:.3}±{tolerance:.3} shape {shape_count}/{input_count}{extent}, \
                 kept {retained_count}"
            )
        }
    }
}
