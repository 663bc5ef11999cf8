//! Aspect-ratio and size filtering of component bounding boxes.
//!
//! [`filter`] keeps boxes whose `width / height` lies strictly inside
//! `(target_ratio - tolerance, target_ratio + tolerance)` and whose sides
//! meet the configured minimums. [`filter_by_extent`] optionally prunes
//! by `sqrt(area)` afterwards. Both preserve input order.
//!
//! This is step 4 in the pipeline, between labeling and rendering.

use crate::types::{BoundingBox, PipelineError, ShapeCriteria};

/// Returns `true` if `aspect` is strictly inside the tolerance window.
#[must_use]
pub fn aspect_matches(aspect: f64, target_ratio: f64, tolerance: f64) -> bool {
    aspect > target_ratio - tolerance && aspect < target_ratio + tolerance
}

/// Keep the boxes that match `criteria`, in input order.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidArgument`] if `criteria` fails
/// [`ShapeCriteria::validate`]. Returns [`PipelineError::InvalidState`]
/// if any box has zero height, since labeled components always cover at
/// least one pixel.
pub fn filter(
    boxes: &[BoundingBox],
    criteria: &ShapeCriteria,
) -> Result<Vec<BoundingBox>, PipelineError> {
    criteria.validate()?;

    let mut kept = Vec::new();
    for b in boxes {
        let Some(aspect) = b.aspect_ratio() else {
            return Err(PipelineError::InvalidState(format!(
                "bounding box {b:?} has zero height"
            )));
        };

        if aspect_matches(aspect, criteria.target_ratio, criteria.tolerance)
            && b.width() >= criteria.min_width
            && b.height() >= criteria.min_height
        {
            kept.push(*b);
        }
    }

    tracing::debug!(
        input = boxes.len(),
        kept = kept.len(),
        target_ratio = criteria.target_ratio,
        tolerance = criteria.tolerance,
        "shape filter"
    );
    Ok(kept)
}

/// Keep the boxes whose extent (`sqrt(area)`) lies within the limits.
///
/// A `None` limit is not applied. Limits are inclusive.
#[must_use]
pub fn filter_by_extent(
    boxes: &[BoundingBox],
    min_extent: Option<f64>,
    max_extent: Option<f64>,
) -> Vec<BoundingBox> {
    boxes
        .iter()
        .filter(|b| {
            let extent = b.extent();
            min_extent.is_none_or(|lo| extent >= lo) && max_extent.is_none_or(|hi| extent <= hi)
        })
        .copied()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn criteria(
        target_ratio: f64,
        tolerance: f64,
        min_width: u32,
        min_height: u32,
    ) -> ShapeCriteria {
        ShapeCriteria {
            target_ratio,
            tolerance,
            min_width,
            min_height,
        }
    }

    fn shaped(boxes: &[BoundingBox], c: &ShapeCriteria) -> Vec<BoundingBox> {
        filter(boxes, c).unwrap()
    }

    #[test]
    fn exact_ratio_is_kept() {
        let boxes = [BoundingBox::new(0, 0, 10, 20)];
        let kept = filter(&boxes, &criteria(0.5, 0.05, 5, 5)).unwrap();
        assert_eq!(kept, boxes);
    }

    #[test]
    fn interval_is_open() {
        // aspect == 1.0 == target + tolerance: rejected.
        let boxes = [BoundingBox::new(0, 0, 20, 20)];
        assert!(shaped(&boxes, &criteria(0.5, 0.5, 1, 1)).is_empty());
        // aspect == 0.25 == target - tolerance: rejected.
        let boxes = [BoundingBox::new(0, 0, 5, 20)];
        assert!(shaped(&boxes, &criteria(0.5, 0.25, 1, 1)).is_empty());
    }

    #[test]
    fn zero_tolerance_rejects_everything() {
        let boxes = [BoundingBox::new(0, 0, 10, 20)];
        assert!(shaped(&boxes, &criteria(0.5, 0.0, 1, 1)).is_empty());
    }

    #[test]
    fn minimum_width_is_inclusive() {
        let boxes = [BoundingBox::new(0, 0, 50, 100)];
        assert_eq!(shaped(&boxes, &criteria(0.5, 0.1, 50, 50)).len(), 1);
        assert!(shaped(&boxes, &criteria(0.5, 0.1, 51, 50)).is_empty());
    }

    #[test]
    fn minimum_height_applies_to_height() {
        let boxes = [BoundingBox::new(0, 0, 10, 20)];
        assert_eq!(shaped(&boxes, &criteria(0.5, 0.1, 1, 20)).len(), 1);
        assert!(shaped(&boxes, &criteria(0.5, 0.1, 1, 21)).is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let boxes = [
            BoundingBox::new(50, 0, 60, 20),
            BoundingBox::new(0, 0, 40, 20),
            BoundingBox::new(0, 50, 10, 70),
        ];
        let kept = filter(&boxes, &criteria(0.5, 0.1, 1, 1)).unwrap();
        assert_eq!(kept, vec![boxes[0], boxes[2]]);
    }

    #[test]
    fn zero_height_box_is_invalid_state() {
        let boxes = [BoundingBox::new(0, 0, 10, 20), BoundingBox::new(3, 7, 9, 7)];
        assert!(matches!(
            filter(&boxes, &criteria(0.5, 0.1, 1, 1)),
            Err(PipelineError::InvalidState(_))
        ));
    }

    #[test]
    fn invalid_tolerance_is_invalid_argument() {
        let boxes = [BoundingBox::new(0, 0, 10, 20)];
        assert!(matches!(
            filter(&boxes, &criteria(0.5, f64::INFINITY, 1, 1)),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(filter(&[], &ShapeCriteria::default()).unwrap().is_empty());
    }

    #[test]
    fn retained_boxes_satisfy_bounds() {
        let boxes: Vec<BoundingBox> = (1..30)
            .flat_map(|w| (1..30).map(move |h| BoundingBox::new(0, 0, w, h)))
            .collect();
        let c = criteria(0.7, 0.05, 3, 4);
        for b in filter(&boxes, &c).unwrap() {
            let aspect = f64::from(b.width()) / f64::from(b.height());
            assert!((aspect - c.target_ratio).abs() < c.tolerance, "{b:?}");
            assert!(b.width() >= c.min_width && b.height() >= c.min_height);
        }
    }

    #[test]
    fn extent_limits() {
        let boxes = [
            BoundingBox::new(0, 0, 2, 2),   // extent 2
            BoundingBox::new(0, 0, 10, 10), // extent 10
            BoundingBox::new(0, 0, 40, 40), // extent 40
        ];
        assert_eq!(filter_by_extent(&boxes, None, None), boxes);
        assert_eq!(filter_by_extent(&boxes, Some(10.0), None), boxes[1..]);
        assert_eq!(filter_by_extent(&boxes, None, Some(10.0)), boxes[..2]);
        assert_eq!(filter_by_extent(&boxes, Some(3.0), Some(20.0)), [boxes[1]]);
    }
}
