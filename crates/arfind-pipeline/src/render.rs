//! Draw bounding-box outlines onto a copy of the source image.
//!
//! Each box is outlined from `(x_min, y_min)` to `(x_max, y_max)`
//! inclusive, so the stroke sits just outside the component's last
//! column and row. Thicker strokes are built from nested one-pixel
//! rectangles centred on that outline. Pixels falling outside the image
//! are clipped.
//!
//! This is step 5 in the pipeline. It never filters: every box passed in
//! is drawn, in order, so later boxes paint over earlier ones.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

/// Stroke colour and thickness for box outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxStyle {
    /// RGB stroke colour.
    pub color: [u8; 3],
    /// Stroke width in pixels. Zero draws nothing.
    pub thickness: u32,
}

impl BoxStyle {
    /// Default outline colour (red).
    pub const DEFAULT_COLOR: [u8; 3] = [255, 0, 0];
    /// Default outline thickness.
    pub const DEFAULT_THICKNESS: u32 = 2;
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR,
            thickness: Self::DEFAULT_THICKNESS,
        }
    }
}

/// Return a copy of `image` with every box outlined.
#[must_use = "returns the annotated image"]
pub fn render(image: &RgbImage, boxes: &[BoundingBox], style: &BoxStyle) -> RgbImage {
    let mut canvas = image.clone();
    for b in boxes {
        draw_box_mut(&mut canvas, b, style);
    }
    canvas
}

/// Outline a single box in place.
pub fn draw_box_mut(canvas: &mut RgbImage, b: &BoundingBox, style: &BoxStyle) {
    let color = Rgb(style.color);
    let reach = canvas.width().max(canvas.height());
    for rect in stroke_rects(b, style.thickness, reach) {
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// One-pixel rectangles that together form a stroke of `thickness`.
///
/// Layer offsets run from `-(thickness - 1) / 2` upward, so odd widths
/// are centred on the outline and even widths lean outward by one pixel.
/// Offsets are capped at `reach` in both directions; layers past it lie
/// entirely outside a canvas whose larger side is `reach`.
fn stroke_rects(b: &BoundingBox, thickness: u32, reach: u32) -> Vec<Rect> {
    let reach = i64::from(reach);
    let inset = i64::from(thickness.saturating_sub(1) / 2);
    let first = -(inset.min(reach));
    let last = (i64::from(thickness) - 1 - inset).min(reach);
    (first..=last)
        .filter_map(|grow| {
            let left = i64::from(b.x_min) - grow;
            let top = i64::from(b.y_min) - grow;
            let width = i64::from(b.width()) + 1 + 2 * grow;
            let height = i64::from(b.height()) + 1 + 2 * grow;
            if width <= 0 || height <= 0 {
                return None;
            }
            Some(
                Rect::at(i32::try_from(left).ok()?, i32::try_from(top).ok()?)
                    .of_size(u32::try_from(width).ok()?, u32::try_from(height).ok()?),
            )
        })
        .collect()
}
