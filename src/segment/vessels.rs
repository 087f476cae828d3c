//! Vessel segmentation.
//!
//! Vessels appear as rings in the chroma channels: the wall is stained, the
//! lumen is not. A single threshold therefore yields rings (and speckle)
//! rather than solid objects. The pipeline recovers the lumen:
//!
//! ```text
//!  RGB ──► YCbCr ──► invert ──► stretch Cb / Cr ──► threshold ──► base mask
//!                                                                  │
//!                                                   close(5) + open(5)
//!                                                                  │
//!            ┌──────────────── dilate(20) ◄────────────────────────┤
//!            ▼                                                     │
//!   label (8-conn) ──► keep objects with holes ──► fill holes      │
//!                                                    │             │
//!                                                 erode(20) ──► maximum
//!                                                                  │
//!                                  label ──► area filter ──► compact ──► relabel
//! ```
//!
//! All thresholds and element sizes are calibration constants for one imaging
//! protocol; they are exposed as named constants rather than parameters.

use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::error::SegmentError;
use crate::raster::filter::{extract_channel, invert_rgb, to_ycbcr};
use crate::raster::{
    close, compact, dilate, erode, fill_small_holes, label, maximum, normalize_percentile, open,
    region_props, Connectivity, LabelMap, RegionProps, StructuringElement, BACKGROUND, FOREGROUND,
};

/// Percentile bounds used to stretch the inverted Cb channel.
pub const CB_PERCENTILES: (f64, f64) = (50.0, 99.5);

/// Percentile bounds used to stretch the inverted Cr channel.
pub const CR_PERCENTILES: (f64, f64) = (1.0, 99.0);

/// Minimum stretched inverted-Cb value of a vessel pixel.
pub const CB_MIN: u8 = 174;

/// Maximum stretched inverted-Cr value of a vessel pixel.
pub const CR_MAX: u8 = 130;

/// Element used for the close/open cleanup of the base mask.
pub const CLEANUP_ELEMENT: StructuringElement = StructuringElement::square(5);

/// Element merging nearby fragments into candidate vessels.
pub const MERGE_ELEMENT: StructuringElement = StructuringElement::square(20);

/// Minimum filled area, in pixels, of a reported object.
pub const MIN_OBJECT_AREA: u64 = 225;

// =============================================================================
// Segmentation
// =============================================================================

/// Final objects of a segmentation: a dense label map and its measurements.
///
/// An image without any qualifying object yields an all-zero map and no
/// regions; this is a normal outcome, not an error.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Labels `1..=regions.len()`, 8-connected
    pub labels: LabelMap,

    /// Properties of each label, ordered by label
    pub regions: Vec<RegionProps>,
}

impl Segmentation {
    /// An empty segmentation of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            labels: LabelMap::new(width, height),
            regions: Vec::new(),
        }
    }

    /// True if no object survived the filters.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of detected objects.
    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Stretch a chroma channel, treating a flat channel as carrying no signal.
fn stretch_channel(channel: &GrayImage, bounds: (f64, f64)) -> Result<GrayImage, SegmentError> {
    match normalize_percentile(channel, bounds.0, bounds.1) {
        Ok(stretched) => Ok(stretched),
        Err(SegmentError::DegenerateRange { lower, upper }) => {
            debug!(lower, upper, "flat chroma channel, no signal");
            let (width, height) = channel.dimensions();
            Ok(GrayImage::new(width, height))
        }
        Err(e) => Err(e),
    }
}

/// Step 1: pixels of the target hue family.
pub fn base_mask(image: &RgbImage) -> Result<GrayImage, SegmentError> {
    let inverted = invert_rgb(&to_ycbcr(image));

    let cb = stretch_channel(&extract_channel(&inverted, 1)?, CB_PERCENTILES)?;
    let cr = stretch_channel(&extract_channel(&inverted, 2)?, CR_PERCENTILES)?;
    drop(inverted);

    let mut mask = cb;
    for (dst, &red) in mask.iter_mut().zip(cr.as_raw()) {
        *dst = if *dst >= CB_MIN && red <= CR_MAX {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    Ok(mask)
}

/// Steps 3 and 4: fill the lumen of ring-shaped objects.
///
/// Returns `None` when no merged object contains a hole.
fn recover_lumens(mask: &GrayImage) -> Option<GrayImage> {
    let medium = label(&dilate(mask, MERGE_ELEMENT), Connectivity::Eight);
    let props = region_props(&medium);

    let with_hole: Vec<u32> = props.iter().filter(|p| p.has_hole()).map(|p| p.label).collect();
    let max_filled = props
        .iter()
        .filter(|p| p.has_hole())
        .map(|p| p.filled_area)
        .max()?;
    debug!(
        candidates = props.len(),
        with_hole = with_hole.len(),
        max_filled,
        "merged objects"
    );
    drop(props);

    let hollow = compact(&medium, &with_hole).to_mask();
    drop(medium);
    let filled = fill_small_holes(&hollow, max_filled);
    Some(erode(&filled, MERGE_ELEMENT))
}

/// Run the vessel pipeline on an RGB image.
pub fn segment_vessels(image: &RgbImage) -> Result<Segmentation, SegmentError> {
    let (width, height) = image.dimensions();

    // Steps 1-2
    let mask = base_mask(image)?;
    let mask = open(&close(&mask, CLEANUP_ELEMENT), CLEANUP_ELEMENT);

    // Steps 3-4
    let merged = match recover_lumens(&mask) {
        Some(lumens) => maximum(&mask, &lumens)?,
        None => mask,
    };

    // Step 5
    let labels = label(&merged, Connectivity::Eight);
    drop(merged);
    let valid: Vec<u32> = region_props(&labels)
        .iter()
        .filter(|p| p.filled_area >= MIN_OBJECT_AREA)
        .map(|p| p.label)
        .collect();
    debug!(objects = labels.max_label(), valid = valid.len(), "area filter");

    if valid.is_empty() {
        return Ok(Segmentation::empty(width, height));
    }
    let kept = compact(&labels, &valid).to_mask();
    drop(labels);

    // Step 6
    let labels = label(&kept, Connectivity::Eight);
    let regions = region_props(&labels);
    Ok(Segmentation { labels, regions })
}

// =============================================================================
// Tests
// =============================================================================
