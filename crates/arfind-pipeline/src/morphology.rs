//! Binary erosion with a 3x3 cross-shaped structuring element.
//!
//! A pixel survives only if it and its four edge neighbours are all
//! foreground. Neighbours outside the image count as background, so
//! regions touching the border lose their outermost row or column.
//!
//! This is step 2 in the pipeline, between binarization and labeling.
//! It removes one-pixel-wide noise and cuts thin bridges that would
//! otherwise merge separate regions.

use crate::types::BinaryMask;

/// Offsets of the cross structuring element, excluding the centre.
const CROSS: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Erode `mask` once with the 3x3 cross. Returns a new mask.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &BinaryMask) -> BinaryMask {
    let (width, height) = (mask.width(), mask.height());
    BinaryMask::from_fn(width, height, |x, y| {
        mask.get(x, y)
            && CROSS.iter().all(|&(dx, dy)| {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                match (u32::try_from(nx), u32::try_from(ny)) {
                    (Ok(nx), Ok(ny)) => mask.get(nx, ny),
                    _ => false,
                }
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    #[test]
    fn empty_mask_stays_empty() {
        let mask = BinaryMask::new(6, 6);
        assert_eq!(erode(&mask), mask);
    }

    #[test]
    fn single_pixel_disappears() {
        let mut mask = BinaryMask::new(5, 5);
        mask.set(2, 2, true);
        assert_eq!(erode(&mask).foreground_count(), 0);
    }

    #[test]
    fn interior_rectangle_shrinks_by_one_on_each_side() {
        let mut mask = BinaryMask::new(20, 20);
        mask.fill_rect(BoundingBox::new(5, 5, 15, 12));
        let eroded = erode(&mask);
        assert_eq!(eroded.foreground_count(), 8 * 5);
        assert!(eroded.get(6, 6));
        assert!(!eroded.get(5, 6));
        assert!(!eroded.get(14, 6));
        assert!(eroded.get(13, 10));
        assert!(!eroded.get(13, 11));
    }

    #[test]
    fn plus_shape_keeps_only_centre() {
        let mut mask = BinaryMask::new(5, 5);
        for (x, y) in [(2, 1), (1, 2), (2, 2), (3, 2), (2, 3)] {
            mask.set(x, y, true);
        }
        let eroded = erode(&mask);
        assert_eq!(eroded.foreground_count(), 1);
        assert!(eroded.get(2, 2));
    }

    #[test]
    fn diagonals_are_not_required() {
        // A 3x3 block minus its corners is exactly the cross: centre survives.
        let mut mask = BinaryMask::new(3, 3);
        for (x, y) in [(1, 0), (0, 1), (1, 1), (2, 1), (1, 2)] {
            mask.set(x, y, true);
        }
        assert!(erode(&mask).get(1, 1));
    }

    #[test]
    fn border_counts_as_background() {
        let mut mask = BinaryMask::new(4, 4);
        mask.fill_rect(BoundingBox::new(0, 0, 4, 4));
        let eroded = erode(&mask);
        assert_eq!(eroded.foreground_count(), 4);
        assert!(!eroded.get(0, 0));
        assert!(!eroded.get(3, 1));
        assert!(eroded.get(1, 1));
        assert!(eroded.get(2, 2));
    }

    #[test]
    fn thin_bridge_is_cut() {
        // Two 5x5 blocks joined by a one-pixel-tall bridge.
        let mut mask = BinaryMask::new(20, 9);
        mask.fill_rect(BoundingBox::new(1, 2, 6, 7));
        mask.fill_rect(BoundingBox::new(13, 2, 18, 7));
        mask.fill_rect(BoundingBox::new(6, 4, 13, 5));
        let eroded = erode(&mask);
        assert!(!eroded.get(9, 4), "bridge should be removed");
        assert!(eroded.get(3, 4));
        assert!(eroded.get(15, 4));
    }

    #[test]
    fn erosion_never_adds_pixels() {
        let mask = BinaryMask::from_fn(12, 9, |x, y| (x * 7 + y * 3) % 5 != 0);
        let eroded = erode(&mask);
        for y in 0..9 {
            for x in 0..12 {
                assert!(!eroded.get(x, y) || mask.get(x, y));
            }
        }
    }

    #[test]
    fn input_is_not_modified() {
        let mut mask = BinaryMask::new(4, 4);
        mask.set(1, 1, true);
        let before = mask.clone();
        let _ = erode(&mask);
        assert_eq!(mask, before);
    }
}
