//! Connected-component labeling and label compaction.
//!
//! # Labeling
//!
//! [`label`] is a two-pass union-find labeling. Provisional labels are issued
//! in raster order and equivalent labels are merged toward the smallest one,
//! so after flattening, final labels are consecutive and ordered by the
//! raster position of each component's first pixel.
//!
//! # Compaction
//!
//! [`compact`] keeps a chosen subset of labels and renumbers it `1..=K` in the
//! order given. The remap is out-of-place through a lookup table indexed by
//! the source label, so a target ID can never be confused with a source ID
//! that has not been processed yet.

use image::{GrayImage, Rgb, RgbImage};

use crate::error::SegmentError;

use super::{BACKGROUND, FOREGROUND};

// =============================================================================
// Connectivity
// =============================================================================

/// Pixel adjacency used when grouping pixels into components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Horizontal and vertical neighbors only
    Four,
    /// Horizontal, vertical and diagonal neighbors
    Eight,
}

impl Connectivity {
    /// Offsets `(dx, dy)` of the neighbors already visited in a raster scan.
    fn backward_offsets(self) -> &'static [(i64, i64)] {
        match self {
            Connectivity::Four => &[(0, -1), (-1, 0)],
            Connectivity::Eight => &[(-1, -1), (0, -1), (1, -1), (-1, 0)],
        }
    }

    /// Offsets `(dx, dy)` of all neighbors.
    pub(crate) fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Connectivity::Four => &[(0, -1), (-1, 0), (1, 0), (0, 1)],
            Connectivity::Eight => &[
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 0),
                (1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ],
        }
    }
}

// =============================================================================
// LabelMap
// =============================================================================

/// A single-channel integer image where 0 is background and each positive
/// value identifies one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl LabelMap {
    /// Create an all-background label map.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap a row-major label buffer.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `data.len() != width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u32>) -> Result<Self, SegmentError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SegmentError::DimensionMismatch {
                expected: (width, height),
                actual: (data.len() as u32, 1),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Label at pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the map.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Row-major label buffer.
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Largest label present (0 for an all-background map).
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// True if no pixel carries a positive label.
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&l| l == 0)
    }

    /// Number of pixels per label, indexed by label (index 0 is background).
    pub fn pixel_counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.max_label() as usize + 1];
        for &l in &self.data {
            counts[l as usize] += 1;
        }
        counts
    }

    /// Distinct positive labels, ascending.
    pub fn labels(&self) -> Vec<u32> {
        self.pixel_counts()
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, &count)| count > 0)
            .map(|(l, _)| l as u32)
            .collect()
    }

    /// Binary mask of all labeled pixels.
    pub fn to_mask(&self) -> GrayImage {
        let raw = self
            .data
            .iter()
            .map(|&l| if l > 0 { FOREGROUND } else { BACKGROUND })
            .collect();
        // Length matches width * height by construction
        GrayImage::from_raw(self.width, self.height, raw).unwrap_or_else(|| GrayImage::new(0, 0))
    }
}

// =============================================================================
// Labeling
// =============================================================================

fn find_root(parents: &mut [u32], label: u32) -> u32 {
    let mut current = label;
    while parents[current as usize] != current {
        let grandparent = parents[parents[current as usize] as usize];
        parents[current as usize] = grandparent;
        current = grandparent;
    }
    current
}

fn union(parents: &mut [u32], a: u32, b: u32) {
    let root_a = find_root(parents, a);
    let root_b = find_root(parents, b);
    if root_a < root_b {
        parents[root_b as usize] = root_a;
    } else if root_b < root_a {
        parents[root_a as usize] = root_b;
    }
}

/// Label the connected components of a mask.
///
/// Any non-zero sample is foreground. Labels are consecutive starting at 1,
/// ordered by the raster position of each component's first pixel.
pub fn label(mask: &GrayImage, connectivity: Connectivity) -> LabelMap {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as i64, height as i64);
    let src = mask.as_raw();
    let mut labels = LabelMap::new(width, height);
    let mut parents: Vec<u32> = vec![0];

    // First pass: provisional labels and equivalences
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if src[idx] == BACKGROUND {
                continue;
            }

            let mut current = 0u32;
            for &(dx, dy) in connectivity.backward_offsets() {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w {
                    continue;
                }
                let neighbor = labels.data[(ny * w + nx) as usize];
                if neighbor == 0 {
                    continue;
                }
                if current == 0 {
                    current = neighbor;
                } else if neighbor != current {
                    union(&mut parents, current, neighbor);
                    current = current.min(neighbor);
                }
            }

            if current == 0 {
                current = parents.len() as u32;
                parents.push(current);
            }
            labels.data[idx] = current;
        }
    }

    // Flatten the forest and assign consecutive final labels
    let mut final_labels = vec![0u32; parents.len()];
    let mut next = 1u32;
    for provisional in 1..parents.len() as u32 {
        let root = find_root(&mut parents, provisional);
        if final_labels[root as usize] == 0 {
            final_labels[root as usize] = next;
            next += 1;
        }
        final_labels[provisional as usize] = final_labels[root as usize];
    }

    // Second pass
    for l in labels.data.iter_mut() {
        *l = final_labels[*l as usize];
    }

    labels
}

// =============================================================================
// Compaction
// =============================================================================

/// Keep only the labels in `keep`, renumbered by their 1-based rank in `keep`.
///
/// Every pixel whose label is in `keep` receives its rank; every other pixel
/// becomes 0. `keep` is treated as an ordered set: 0 and repeated entries are
/// ignored, and labels absent from the map still consume a rank.
///
/// Runs in O(pixels) with an O(max label) lookup table.
pub fn compact(labels: &LabelMap, keep: &[u32]) -> LabelMap {
    let max_label = labels.max_label() as usize;
    let mut table = vec![0u32; max_label + 1];
    let mut seen = std::collections::HashSet::with_capacity(keep.len());
    let mut rank = 0u32;

    for &source in keep {
        if source == 0 || !seen.insert(source) {
            continue;
        }
        rank += 1;
        if let Some(slot) = table.get_mut(source as usize) {
            *slot = rank;
        }
    }

    LabelMap {
        width: labels.width,
        height: labels.height,
        data: labels.data.iter().map(|&l| table[l as usize]).collect(),
    }
}

// =============================================================================
// Boundaries
// =============================================================================

/// Pixels whose 4-neighborhood (inside the image) contains a different label.
///
/// Both sides of a boundary are marked, so an object's outline and the
/// background ring around it are both flagged.
pub fn find_boundaries(labels: &LabelMap) -> Vec<bool> {
    let (w, h) = (labels.width as i64, labels.height as i64);
    let mut boundaries = vec![false; labels.data.len()];
    for y in 0..h {
        for x in 0..w {
            let here = labels.data[(y * w + x) as usize];
            boundaries[(y * w + x) as usize] =
                Connectivity::Four.offsets().iter().any(|&(dx, dy)| {
                    let (nx, ny) = (x + dx, y + dy);
                    nx >= 0 && ny >= 0 && nx < w && ny < h && labels.data[(ny * w + nx) as usize] != here
                });
        }
    }
    boundaries
}

/// Draw label boundaries over a copy of `image` in the given color.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the image and label map differ in size.
pub fn mark_boundaries(
    image: &RgbImage,
    labels: &LabelMap,
    color: Rgb<u8>,
) -> Result<RgbImage, SegmentError> {
    if image.dimensions() != labels.dimensions() {
        return Err(SegmentError::DimensionMismatch {
            expected: labels.dimensions(),
            actual: image.dimensions(),
        });
    }

    let mut out = image.clone();
    for (i, is_boundary) in find_boundaries(labels).into_iter().enumerate() {
        if is_boundary {
            let x = (i % labels.width as usize) as u32;
            let y = (i / labels.width as usize) as u32;
            out.put_pixel(x, y, color);
        }
    }
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_from(pattern: &[&str]) -> GrayImage {
        let height = pattern.len() as u32;
        let width = pattern[0].len() as u32;
        GrayImage::from_fn(width, height, |x, y| {
            let c = pattern[y as usize].as_bytes()[x as usize];
            Luma([if c == b'#' { FOREGROUND } else { BACKGROUND }])
        })
    }

    fn labels_of(map: &LabelMap) -> Vec<Vec<u32>> {
        (0..map.height())
            .map(|y| (0..map.width()).map(|x| map.get(x, y)).collect())
            .collect()
    }

    #[test]
    fn test_label_empty() {
        let map = label(&GrayImage::new(5, 5), Connectivity::Eight);
        assert!(map.is_empty());
        assert_eq!(map.max_label(), 0);
    }

    #[test]
    fn test_label_diagonal_connectivity() {
        let mask = mask_from(&["#..", ".#.", "..#"]);
        assert_eq!(label(&mask, Connectivity::Eight).max_label(), 1);
        assert_eq!(label(&mask, Connectivity::Four).max_label(), 3);
    }

    #[test]
    fn test_label_u_shape_merges() {
        // Two arms discovered separately, joined by the bottom row
        let mask = mask_from(&["#.#", "#.#", "###"]);
        let map = label(&mask, Connectivity::Four);
        assert_eq!(map.max_label(), 1);
        assert_eq!(map.pixel_counts()[1], 7);
    }

    #[test]
    fn test_label_raster_order() {
        let mask = mask_from(&["..#", "#..", "..."]);
        let map = label(&mask, Connectivity::Four);
        assert_eq!(labels_of(&map), vec![vec![0, 0, 1], vec![2, 0, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn test_label_consecutive_after_merge() {
        let mask = mask_from(&["#.#.#", "#####", ".....", "#...."]);
        let map = label(&mask, Connectivity::Eight);
        assert_eq!(map.labels(), vec![1, 2]);
        assert_eq!(map.get(0, 3), 2);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(LabelMap::from_raw(2, 2, vec![0; 4]).is_ok());
        assert!(LabelMap::from_raw(2, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn test_compact_reorders_and_drops() {
        let map = LabelMap::from_raw(5, 1, vec![1, 2, 3, 4, 0]).unwrap();
        let out = compact(&map, &[4, 2]);
        assert_eq!(out.as_slice(), &[0, 2, 0, 1, 0]);
    }

    #[test]
    fn test_compact_no_collision() {
        // Target ids 1 and 2 overlap source ids that must be dropped or moved
        let map = LabelMap::from_raw(4, 1, vec![1, 2, 3, 4]).unwrap();
        let out = compact(&map, &[3, 4]);
        assert_eq!(out.as_slice(), &[0, 0, 1, 2]);
    }

    #[test]
    fn test_compact_ignores_zero_and_duplicates() {
        let map = LabelMap::from_raw(3, 1, vec![5, 7, 9]).unwrap();
        let out = compact(&map, &[0, 9, 9, 5, 42]);
        assert_eq!(out.as_slice(), &[2, 0, 1]);
    }

    #[test]
    fn test_compact_idempotent() {
        let mask = mask_from(&["#.#.#", ".....", "#.#.#"]);
        let map = label(&mask, Connectivity::Eight);
        let keep = [5, 1, 3];
        let once = compact(&map, &keep);
        let twice = compact(&once, &[1, 2, 3]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_compact_preserves_pixel_counts() {
        let mask = mask_from(&["##..#", "##..#", ".....", "###.."]);
        let map = label(&mask, Connectivity::Eight);
        let before = map.pixel_counts();
        let out = compact(&map, &[3, 1]);
        let after = out.pixel_counts();
        assert_eq!(after[1], before[3]);
        assert_eq!(after[2], before[1]);
        assert_eq!(after.iter().skip(1).sum::<u64>(), before[1] + before[3]);
    }

    #[test]
    fn test_to_mask() {
        let map = LabelMap::from_raw(3, 1, vec![0, 4, 1]).unwrap();
        assert_eq!(map.to_mask().as_raw(), &vec![0, 255, 255]);
    }

    #[test]
    fn test_mark_boundaries() {
        let mask = mask_from(&[".....", ".###.", ".###.", ".###.", "....."]);
        let map = label(&mask, Connectivity::Eight);
        let img = RgbImage::from_pixel(5, 5, Rgb([255, 255, 255]));
        let out = mark_boundaries(&img, &map, Rgb([0, 255, 0])).unwrap();

        // Object outline and adjacent background are marked, interior and corners are not
        assert_eq!(*out.get_pixel(1, 1), Rgb([0, 255, 0]));
        assert_eq!(*out.get_pixel(0, 2), Rgb([0, 255, 0]));
        assert_eq!(*out.get_pixel(2, 2), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_mark_boundaries_size_mismatch() {
        let map = LabelMap::new(3, 3);
        let img = RgbImage::new(4, 3);
        assert!(mark_boundaries(&img, &map, Rgb([0, 255, 0])).is_err());
    }
}
