//! Binary and grey-level morphology with rectangular structuring elements.
//!
//! All structuring elements used by the pipeline are all-ones rectangles, so
//! erosion and dilation are computed separably (a row pass followed by a
//! column pass), costing O(pixels x (width + height)) instead of
//! O(pixels x width x height).
//!
//! # Anchor and borders
//!
//! The anchor of a `w x h` element sits at `(w / 2, h / 2)`, so an even-sized
//! element extends one pixel further before the anchor than after it. Pixels
//! outside the image never influence the result: erosion treats them as
//! foreground and dilation as background.

use image::GrayImage;

use crate::error::SegmentError;

use super::labels::{label, Connectivity};
use super::{BACKGROUND, FOREGROUND};

// =============================================================================
// Structuring Element
// =============================================================================

/// An all-ones rectangular structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    pub width: u32,
    pub height: u32,
}

impl StructuringElement {
    /// A `size x size` square element.
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    /// Window offsets `(start, end)` along one axis, inclusive.
    fn span(size: u32) -> (i64, i64) {
        let anchor = (size / 2) as i64;
        (-anchor, size as i64 - 1 - anchor)
    }
}

// =============================================================================
// Erosion / Dilation
// =============================================================================

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    #[inline]
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Extremum::Min => a.min(b),
            Extremum::Max => a.max(b),
        }
    }

    /// Value that leaves the extremum unchanged (used for out-of-image pixels).
    #[inline]
    fn identity(self) -> u8 {
        match self {
            Extremum::Min => u8::MAX,
            Extremum::Max => u8::MIN,
        }
    }
}

/// One separable pass along rows (`horizontal`) or columns.
fn pass(src: &[u8], width: usize, height: usize, size: u32, op: Extremum, horizontal: bool) -> Vec<u8> {
    let (start, end) = StructuringElement::span(size);
    let (outer, inner) = if horizontal { (height, width) } else { (width, height) };
    let index = |o: usize, i: usize| if horizontal { o * width + i } else { i * width + o };

    let mut out = vec![0u8; src.len()];
    for o in 0..outer {
        for i in 0..inner {
            let mut value = op.identity();
            let lo = (i as i64 + start).max(0) as usize;
            let hi = (i as i64 + end).min(inner as i64 - 1);
            if hi >= lo as i64 {
                for j in lo..=hi as usize {
                    value = op.pick(value, src[index(o, j)]);
                }
            }
            out[index(o, i)] = value;
        }
    }
    out
}

fn rank_filter(image: &GrayImage, element: StructuringElement, op: Extremum) -> GrayImage {
    let (width, height) = image.dimensions();
    if element.width == 0 || element.height == 0 || width == 0 || height == 0 {
        return image.clone();
    }
    let (w, h) = (width as usize, height as usize);
    let rows = pass(image.as_raw(), w, h, element.width, op, true);
    let out = pass(&rows, w, h, element.height, op, false);
    // Length preserved by both passes
    GrayImage::from_raw(width, height, out).unwrap_or_else(|| image.clone())
}

/// Grey-level erosion: each pixel becomes the minimum over the element window.
pub fn erode(image: &GrayImage, element: StructuringElement) -> GrayImage {
    rank_filter(image, element, Extremum::Min)
}

/// Grey-level dilation: each pixel becomes the maximum over the element window.
pub fn dilate(image: &GrayImage, element: StructuringElement) -> GrayImage {
    rank_filter(image, element, Extremum::Max)
}

/// Opening (erosion then dilation): removes foreground specks smaller than the element.
pub fn open(image: &GrayImage, element: StructuringElement) -> GrayImage {
    dilate(&erode(image, element), element)
}

/// Closing (dilation then erosion): fills background gaps smaller than the element.
pub fn close(image: &GrayImage, element: StructuringElement) -> GrayImage {
    erode(&dilate(image, element), element)
}

/// Pixelwise maximum of two buffers of equal size.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the buffers differ in size.
pub fn maximum(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, SegmentError> {
    if a.dimensions() != b.dimensions() {
        return Err(SegmentError::DimensionMismatch {
            expected: a.dimensions(),
            actual: b.dimensions(),
        });
    }
    let mut out = a.clone();
    for (dst, &src) in out.iter_mut().zip(b.as_raw()) {
        *dst = (*dst).max(src);
    }
    Ok(out)
}

// =============================================================================
// Hole Filling
// =============================================================================

/// Fill every 8-connected background component smaller than `area_threshold`.
///
/// The result is a mask: foreground pixels and filled holes become
/// [`FOREGROUND`], everything else [`BACKGROUND`]. A background component
/// touching the image border is filled as well when it is small enough.
pub fn fill_small_holes(mask: &GrayImage, area_threshold: u64) -> GrayImage {
    let mut background = mask.clone();
    for sample in background.iter_mut() {
        *sample = if *sample == BACKGROUND { FOREGROUND } else { BACKGROUND };
    }

    let holes = label(&background, Connectivity::Eight);
    drop(background);
    let sizes = holes.pixel_counts();

    let mut out = mask.clone();
    for (dst, &hole) in out.iter_mut().zip(holes.as_slice()) {
        let filled = *dst != BACKGROUND || (hole > 0 && sizes[hole as usize] < area_threshold);
        *dst = if filled { FOREGROUND } else { BACKGROUND };
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
