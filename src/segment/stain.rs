//! Stain-specific processing strategies.
//!
//! Each [`Stain`] maps to a [`StainRule`]: either the full vessel pipeline or
//! a per-pixel rule producing a stained-area mask. A single [`Segmenter`]
//! consumes the rule, so adding a stain means adding a variant and its
//! calibration, not a new code path.

use std::fmt;

use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::SegmentError;
use crate::raster::filter::{extract_channel, to_ycbcr};
use crate::raster::{count_foreground, mark_boundaries, rescale_band, BACKGROUND, FOREGROUND};

use super::vessels::{segment_vessels, Segmentation};

/// Outline color of detected vessels in overlays.
pub const VESSEL_OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);

// =============================================================================
// Stain
// =============================================================================

/// The staining protocol of the images to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stain {
    #[serde(rename = "blood-vessels")]
    BloodVessel,
    AlcianBlue,
    Laminin,
    #[serde(rename = "mvg")]
    MvG,
    Msb,
    S100,
}

impl Stain {
    /// All supported stains.
    pub const ALL: [Stain; 6] = [
        Stain::BloodVessel,
        Stain::AlcianBlue,
        Stain::Laminin,
        Stain::MvG,
        Stain::Msb,
        Stain::S100,
    ];

    /// The detection rule calibrated for this stain.
    pub fn rule(&self) -> StainRule {
        match self {
            Stain::BloodVessel => StainRule::Vessels,
            Stain::AlcianBlue => StainRule::ChannelBand {
                source: ChannelSource::Rgb(0),
                lower: 92,
                upper: 221,
                cutoff: Cutoff::Below(160),
            },
            Stain::Msb => StainRule::ChannelBand {
                source: ChannelSource::Rgb(0),
                lower: 79,
                upper: 233,
                cutoff: Cutoff::Below(160),
            },
            Stain::MvG => StainRule::AllChannelsBelow(150),
            Stain::Laminin | Stain::S100 => StainRule::ChannelBand {
                source: ChannelSource::YCbCr(2),
                lower: 130,
                upper: 145,
                cutoff: Cutoff::Above(120),
            },
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Stain::BloodVessel => "Blood vessels",
            Stain::AlcianBlue => "Alcian blue",
            Stain::Laminin => "Laminin",
            Stain::MvG => "MvG",
            Stain::Msb => "MSB",
            Stain::S100 => "S100",
        }
    }

    /// Color given to stained pixels in overlays (`None` for vessel outlines).
    pub fn highlight(&self) -> Option<Highlight> {
        match self {
            Stain::BloodVessel => None,
            Stain::MvG => Some(Highlight::Black),
            Stain::Laminin | Stain::S100 => Some(Highlight::Red),
            Stain::AlcianBlue | Stain::Msb => Some(Highlight::Blue),
        }
    }
}

impl fmt::Display for Stain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Where a single working channel is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    /// Channel index of the RGB image
    Rgb(usize),
    /// Channel index of the YCbCr conversion
    YCbCr(usize),
}

/// Comparison deciding whether a stretched sample is stained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    Below(u8),
    Above(u8),
}

impl Cutoff {
    #[inline]
    fn is_stained(self, value: u8) -> bool {
        match self {
            Cutoff::Below(level) => value < level,
            Cutoff::Above(level) => value > level,
        }
    }
}

/// Detection rule for one stain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StainRule {
    /// Vessel segmentation with per-object measurements
    Vessels,
    /// Band-stretch one channel, then compare against a cutoff
    ChannelBand {
        source: ChannelSource,
        lower: u8,
        upper: u8,
        cutoff: Cutoff,
    },
    /// Stained iff every RGB channel is below the level
    AllChannelsBelow(u8),
}

/// Overlay color of stained pixels on a white background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Black,
    Red,
    Blue,
}

impl Highlight {
    fn paint(self, stained: bool) -> Rgb<u8> {
        let off = if stained { 0 } else { 255 };
        match self {
            Highlight::Black => Rgb([off, off, off]),
            Highlight::Red => Rgb([255, off, off]),
            Highlight::Blue => Rgb([off, off, 255]),
        }
    }
}

// =============================================================================
// Segmenter
// =============================================================================

/// Result of processing one image.
#[derive(Debug, Clone)]
pub enum StainResult {
    /// Individual objects (vessels)
    Objects(Segmentation),
    /// Stained-area mask
    Area(GrayImage),
}

impl StainResult {
    /// Number of stained pixels (sum of object areas for vessels).
    pub fn stained_area(&self) -> u64 {
        match self {
            StainResult::Objects(seg) => seg.regions.iter().map(|r| r.area).sum(),
            StainResult::Area(mask) => count_foreground(mask),
        }
    }
}

/// Applies the rule of one stain to images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    stain: Stain,
}

impl Segmenter {
    pub fn new(stain: Stain) -> Self {
        Self { stain }
    }

    pub fn stain(&self) -> Stain {
        self.stain
    }

    /// Process one RGB image.
    pub fn segment(&self, image: &RgbImage) -> Result<StainResult, SegmentError> {
        match self.stain.rule() {
            StainRule::Vessels => Ok(StainResult::Objects(segment_vessels(image)?)),
            StainRule::ChannelBand {
                source,
                lower,
                upper,
                cutoff,
            } => {
                let channel = match source {
                    ChannelSource::Rgb(index) => extract_channel(image, index)?,
                    ChannelSource::YCbCr(index) => extract_channel(&to_ycbcr(image), index)?,
                };
                let mut mask = rescale_band(&channel, lower, upper)?;
                for sample in mask.iter_mut() {
                    *sample = if cutoff.is_stained(*sample) { FOREGROUND } else { BACKGROUND };
                }
                Ok(StainResult::Area(mask))
            }
            StainRule::AllChannelsBelow(level) => {
                let (width, height) = image.dimensions();
                let mask = GrayImage::from_fn(width, height, |x, y| {
                    let Rgb(px) = *image.get_pixel(x, y);
                    let stained = px.iter().all(|&v| v < level);
                    image::Luma([if stained { FOREGROUND } else { BACKGROUND }])
                });
                Ok(StainResult::Area(mask))
            }
        }
    }

    /// Render the result for visual review.
    ///
    /// Vessels are outlined over the source image; stained areas are painted
    /// in the stain's highlight color on white.
    pub fn overlay(&self, image: &RgbImage, result: &StainResult) -> Result<RgbImage, SegmentError> {
        match result {
            StainResult::Objects(seg) => mark_boundaries(image, &seg.labels, VESSEL_OUTLINE),
            StainResult::Area(mask) => {
                let highlight = self.stain.highlight().unwrap_or(Highlight::Black);
                let (width, height) = mask.dimensions();
                Ok(RgbImage::from_fn(width, height, |x, y| {
                    highlight.paint(mask.get_pixel(x, y)[0] != BACKGROUND)
                }))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
