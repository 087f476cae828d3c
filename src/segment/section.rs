//! Tissue section detection.
//!
//! A section detector turns a color image into a mask where [`FOREGROUND`]
//! marks tissue and [`BACKGROUND`] marks the bright glass around it. The
//! result feeds area accounting (overall section area) and automatic region
//! selection on slide thumbnails.
//!
//! Two interchangeable strategies are provided:
//!
//! - [`SectionDetector::Threshold`]: for brightfield stains where the glass
//!   is close to white.
//! - [`SectionDetector::BandPass`]: for stains whose background drifts in
//!   brightness; the image is first stretched to its own range and clipped
//!   to a narrow band of near-background intensities.
//!
//! [`FOREGROUND`]: crate::raster::FOREGROUND
//! [`BACKGROUND`]: crate::raster::BACKGROUND

use image::{GrayImage, RgbImage};

use crate::error::SegmentError;
use crate::raster::filter::{gaussian_blur, invert, median_filter, min_max_normalize, threshold, to_grayscale};
use crate::raster::{open, rescale_band, StructuringElement};

/// Gray level separating bright background from tissue.
pub const BACKGROUND_LEVEL: u8 = 210;

/// Gaussian kernel size used to smooth the background mask edges.
pub const BLUR_KERNEL_SIZE: u32 = 21;

/// Opening element removing small bright speckles.
pub const SPECKLE_ELEMENT: StructuringElement = StructuringElement::square(10);

/// Lower bound of the intensity band kept by the band-pass detector.
pub const BAND_LOWER: u8 = 190;

/// Upper bound of the intensity band kept by the band-pass detector.
pub const BAND_UPPER: u8 = 230;

/// Median kernel size used to denoise the band-passed image.
pub const DENOISE_KERNEL_SIZE: u32 = 3;

/// Strategy for separating tissue from background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionDetector {
    /// Threshold, blur, open, re-threshold, invert
    #[default]
    Threshold,
    /// Min-max stretch, band clip, re-stretch, denoise, then blur/open/threshold/invert
    BandPass,
}

impl SectionDetector {
    /// Compute the tissue mask of a color image.
    ///
    /// The output only contains 0 and 255.
    pub fn detect(&self, image: &RgbImage) -> Result<GrayImage, SegmentError> {
        let gray = to_grayscale(image);
        let prepared = match self {
            SectionDetector::Threshold => threshold(&gray, BACKGROUND_LEVEL),
            SectionDetector::BandPass => {
                let stretched = rescale_band(&min_max_normalize(&gray), BAND_LOWER, BAND_UPPER)?;
                median_filter(&stretched, DENOISE_KERNEL_SIZE)?
            }
        };
        drop(gray);
        smooth_and_invert(&prepared)
    }

    /// Short name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            SectionDetector::Threshold => "threshold",
            SectionDetector::BandPass => "band-pass",
        }
    }
}

/// Blur, open, re-threshold and invert a background-bright image.
fn smooth_and_invert(background: &GrayImage) -> Result<GrayImage, SegmentError> {
    let blurred = gaussian_blur(background, BLUR_KERNEL_SIZE, 0.0)?;
    let opened = open(&blurred, SPECKLE_ELEMENT);
    Ok(invert(&threshold(&opened, BACKGROUND_LEVEL)))
}

// =============================================================================
// Tests
// =============================================================================
