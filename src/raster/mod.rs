//! Pixel-level building blocks for the segmentation pipeline.
//!
//! Every operation here is a pure function: it borrows its input buffer and
//! returns a freshly allocated result. Intermediate buffers therefore live
//! exactly as long as the pipeline stage that owns them.
//!
//! # Conventions
//!
//! - Images are `image` crate buffers (`RgbImage`, `GrayImage`).
//! - A **mask** is a `GrayImage` whose samples are exactly [`BACKGROUND`] (0)
//!   or [`FOREGROUND`] (255).
//! - A **label map** ([`LabelMap`]) stores one `u32` per pixel, 0 being background.
//!
//! # Components
//!
//! - [`filter`]: color conversion, thresholding, blurring and denoising
//! - [`normalize`]: percentile statistics and contrast stretching
//! - [`morphology`]: rectangular erosion/dilation and hole filling
//! - [`labels`]: connected-component labeling and label compaction
//! - [`props`]: per-label region measurements

pub mod filter;
pub mod labels;
pub mod morphology;
pub mod normalize;
pub mod props;

pub use labels::{compact, label, mark_boundaries, Connectivity, LabelMap};
pub use morphology::{close, dilate, erode, fill_small_holes, maximum, open, StructuringElement};
pub use normalize::{normalize_percentile, percentile, rescale_band};
pub use props::{region_props, BoundingBox, RegionProps};

/// Sample value of a foreground mask pixel.
pub const FOREGROUND: u8 = 255;

/// Sample value of a background mask pixel.
pub const BACKGROUND: u8 = 0;

/// Count the non-zero samples of a single-channel buffer.
pub fn count_foreground(mask: &image::GrayImage) -> u64 {
    mask.as_raw().iter().filter(|&&v| v != BACKGROUND).count() as u64
}

/// Check that a buffer only contains [`BACKGROUND`] and [`FOREGROUND`] samples.
pub fn is_binary_mask(mask: &image::GrayImage) -> bool {
    mask.as_raw()
        .iter()
        .all(|&v| v == BACKGROUND || v == FOREGROUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_count_foreground() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([FOREGROUND]));
        mask.put_pixel(2, 3, Luma([7]));
        assert_eq!(count_foreground(&mask), 2);
    }

    #[test]
    fn test_is_binary_mask() {
        let mut mask = GrayImage::new(3, 3);
        assert!(is_binary_mask(&mask));
        mask.put_pixel(0, 0, Luma([FOREGROUND]));
        assert!(is_binary_mask(&mask));
        mask.put_pixel(1, 0, Luma([128]));
        assert!(!is_binary_mask(&mask));
    }
}
