//! Connected-component labeling with bounding-box extraction.
//!
//! Two passes over the mask in row-major order:
//!
//! 1. Each foreground pixel takes a provisional label from its already
//!    visited neighbours (or a fresh one). When neighbours disagree their
//!    labels are merged in a [`DisjointSet`].
//! 2. Each pixel's provisional label is resolved to its set root and the
//!    root's bounding box is grown to include the pixel.
//!
//! Components are numbered in the order their first pixel is reached by
//! the raster scan, so the output order depends only on the mask.
//!
//! This is step 3 in the pipeline, after erosion and before the shape
//! filter.

use serde::{Deserialize, Serialize};

use crate::types::{BinaryMask, BoundingBox, PipelineError};

/// Pixel adjacency used to decide whether two foreground pixels touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbours only.
    Four,
    /// Edge and corner neighbours.
    #[default]
    Eight,
}

impl Connectivity {
    /// Offsets of neighbours that precede the current pixel in raster order.
    const fn visited_neighbours(self) -> &'static [(i64, i64)] {
        match self {
            Self::Four => &[(-1, 0), (0, -1)],
            Self::Eight => &[(-1, 0), (-1, -1), (0, -1), (1, -1)],
        }
    }
}

/// Union-find over provisional labels, stored as a flat parent array.
///
/// Unions always keep the smaller label as root. Lookups halve the path
/// as they go.
#[derive(Debug, Default)]
struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    /// Allocate a new singleton set and return its label.
    #[allow(clippy::cast_possible_truncation)]
    fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut label: u32) -> u32 {
        loop {
            let parent = self.parent[label as usize];
            if parent == label {
                return label;
            }
            let grandparent = self.parent[parent as usize];
            self.parent[label as usize] = grandparent;
            label = grandparent;
        }
    }

    /// Merge the sets containing `a` and `b`, returning the new root.
    fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        let (root, child) = if ra <= rb { (ra, rb) } else { (rb, ra) };
        self.parent[child as usize] = root;
        root
    }

    const fn len(&self) -> usize {
        self.parent.len()
    }
}

/// Sentinel for "no label" in both the pixel buffer and the root table.
const UNLABELED: u32 = u32::MAX;

/// Find all connected components and return their bounding boxes.
///
/// Boxes are ordered by the raster position of each component's first
/// pixel. A mask with no foreground yields an empty vector.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the mask has a zero
/// dimension, or more pixels than a `u32` label can address.
#[allow(clippy::cast_possible_truncation)]
pub fn label(
    mask: &BinaryMask,
    connectivity: Connectivity,
) -> Result<Vec<BoundingBox>, PipelineError> {
    let dims = mask.dimensions();
    if dims.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "cannot label a {}x{} mask",
            dims.width, dims.height
        )));
    }
    if dims.pixel_count() >= u64::from(UNLABELED) {
        return Err(PipelineError::InvalidInput(format!(
            "mask of {}x{} pixels is too large to label",
            dims.width, dims.height
        )));
    }

    let (width, height) = (dims.width, dims.height);
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;
    let pixels = mask.as_slice();
    let offsets = connectivity.visited_neighbours();

    // Pass 1: provisional labels and equivalences.
    let mut sets = DisjointSet::default();
    let mut labels = vec![UNLABELED; pixels.len()];
    for y in 0..height {
        for x in 0..width {
            let i = index(x, y);
            if !pixels[i] {
                continue;
            }

            let mut current = UNLABELED;
            for &(dx, dy) in offsets {
                let (Ok(nx), Ok(ny)) = (
                    u32::try_from(i64::from(x) + dx),
                    u32::try_from(i64::from(y) + dy),
                ) else {
                    continue;
                };
                if nx >= width {
                    continue;
                }
                let neighbour = labels[index(nx, ny)];
                if neighbour == UNLABELED {
                    continue;
                }
                current = if current == UNLABELED {
                    sets.find(neighbour)
                } else {
                    sets.union(current, neighbour)
                };
            }

            labels[i] = if current == UNLABELED {
                sets.make_set()
            } else {
                current
            };
        }
    }

    // Pass 2: resolve to roots and accumulate boxes.
    let mut component_of_root = vec![UNLABELED; sets.len()];
    let mut boxes: Vec<BoundingBox> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let provisional = labels[index(x, y)];
            if provisional == UNLABELED {
                continue;
            }
            let root = sets.find(provisional) as usize;
            match component_of_root[root] {
                UNLABELED => {
                    component_of_root[root] = boxes.len() as u32;
                    boxes.push(BoundingBox::new(x, y, x + 1, y + 1));
                }
                component => {
                    let b = &mut boxes[component as usize];
                    b.x_min = b.x_min.min(x);
                    b.x_max = b.x_max.max(x + 1);
                    b.y_max = y + 1;
                }
            }
        }
    }

    tracing::debug!(
        provisional = sets.len(),
        components = boxes.len(),
        ?connectivity,
        "labeled"
    );
    Ok(boxes)
}
