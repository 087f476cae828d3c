//! Region selection on slide thumbnails.
//!
//! The extraction driver asks a [`SelectionProvider`] for the boxes to export
//! from each slide, synchronously, before any full-resolution pixel is read.
//! Boxes are expressed in thumbnail coordinates; the driver maps them back to
//! level 0 with [`SlideGeometry`](crate::slide::SlideGeometry).

use image::RgbImage;
use tracing::debug;

use crate::error::BatchError;
use crate::raster::{label, region_props, Connectivity};
use crate::segment::SectionDetector;
use crate::slide::SelectionBox;

/// Default number of sections kept per slide.
pub const DEFAULT_MAX_SECTIONS: usize = 3;

/// Default minimum section area, in thumbnail pixels.
pub const DEFAULT_MIN_SECTION_AREA: u64 = 1000;

const SIDE_NAMES: [&str; 3] = ["Left", "Center", "Right"];

/// Directory name of the `index`-th of `count` sections of a slide.
///
/// Up to three sections are named by their position on the slide; larger
/// selections fall back to numbered names.
pub fn section_dir_name(index: usize, count: usize) -> String {
    if count <= SIDE_NAMES.len() {
        SIDE_NAMES[index.min(SIDE_NAMES.len() - 1)].to_string()
    } else {
        format!("Section_{}", index + 1)
    }
}

/// Supplier of boxes for a slide.
pub trait SelectionProvider {
    /// Return the boxes to export, in thumbnail coordinates, ordered left to right.
    ///
    /// An empty selection skips the slide.
    fn select(&mut self, slide_name: &str, thumbnail: &RgbImage) -> Result<Vec<SelectionBox>, BatchError>;
}

// =============================================================================
// Fixed Selection
// =============================================================================

/// The same caller-provided boxes for every slide.
#[derive(Debug, Clone, Default)]
pub struct FixedSelection {
    boxes: Vec<SelectionBox>,
}

impl FixedSelection {
    pub fn new(boxes: Vec<SelectionBox>) -> Self {
        Self { boxes }
    }
}

impl SelectionProvider for FixedSelection {
    fn select(&mut self, slide_name: &str, thumbnail: &RgbImage) -> Result<Vec<SelectionBox>, BatchError> {
        let (width, height) = thumbnail.dimensions();
        if let Some(outside) = self.boxes.iter().find(|b| b.max_x > width || b.max_y > height) {
            return Err(BatchError::Selection(format!(
                "box {:?} exceeds the {}x{} thumbnail of {}",
                outside, width, height, slide_name
            )));
        }
        let mut boxes = self.boxes.clone();
        boxes.sort_by_key(|b| (b.min_x, b.min_y));
        Ok(boxes)
    }
}

// =============================================================================
// Automatic Selection
// =============================================================================

/// Picks the largest tissue sections found by a section detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSectionSelector {
    pub detector: SectionDetector,
    pub max_sections: usize,
    pub min_area: u64,
}

impl Default for AutoSectionSelector {
    fn default() -> Self {
        Self {
            detector: SectionDetector::default(),
            max_sections: DEFAULT_MAX_SECTIONS,
            min_area: DEFAULT_MIN_SECTION_AREA,
        }
    }
}

impl SelectionProvider for AutoSectionSelector {
    fn select(&mut self, slide_name: &str, thumbnail: &RgbImage) -> Result<Vec<SelectionBox>, BatchError> {
        let mask = self.detector.detect(thumbnail)?;
        let labels = label(&mask, Connectivity::Eight);
        drop(mask);

        let mut regions: Vec<_> = region_props(&labels)
            .into_iter()
            .filter(|r| r.area >= self.min_area)
            .collect();
        regions.sort_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));
        regions.truncate(self.max_sections);

        let mut boxes = regions
            .iter()
            .map(|r| SelectionBox::from_bbox(&r.bbox))
            .collect::<Result<Vec<_>, _>>()?;
        boxes.sort_by_key(|b| (b.min_x, b.min_y));

        debug!(slide = slide_name, components = labels.max_label(), selected = boxes.len(), "auto selection");
        Ok(boxes)
    }
}

// =============================================================================
// Tests
// =============================================================================
