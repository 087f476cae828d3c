//! Per-section measurement reports.
//!
//! A report is produced for every processed section directory. Vessel
//! processing emits one record per detected vessel plus the overall tissue
//! area; the other stains emit the stained and overall areas. All values are
//! in pixels; `umPerPixel` carries the calibration needed to convert them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::segment::{Stain, StainResult};

/// File name of the report inside a section directory.
pub const REPORT_FILE_NAME: &str = "data.json";

// =============================================================================
// Records
// =============================================================================

/// Measurements of one detected vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselRecord {
    /// 1-based running index over the whole section
    pub index: usize,
    /// Source image file name
    pub image: String,
    pub minor_axis_length: f64,
    pub filled_area: u64,
    pub perimeter: f64,
}

/// Measurements accumulated over the images of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionMeasurements {
    #[serde(rename_all = "camelCase")]
    Vessels {
        vessels: Vec<VesselRecord>,
        overall_section_area: u64,
    },
    #[serde(rename_all = "camelCase")]
    StainedArea { stained_area: u64, overall_area: u64 },
}

impl SectionMeasurements {
    /// Empty measurements of the shape matching a stain.
    pub fn for_stain(stain: Stain) -> Self {
        match stain {
            Stain::BloodVessel => SectionMeasurements::Vessels {
                vessels: Vec::new(),
                overall_section_area: 0,
            },
            _ => SectionMeasurements::StainedArea {
                stained_area: 0,
                overall_area: 0,
            },
        }
    }

    /// Accumulate the result of one image.
    pub fn add(&mut self, image: &str, result: &StainResult, section_area: u64) {
        match self {
            SectionMeasurements::Vessels {
                vessels,
                overall_section_area,
            } => {
                *overall_section_area += section_area;
                if let StainResult::Objects(seg) = result {
                    for region in &seg.regions {
                        vessels.push(VesselRecord {
                            index: vessels.len() + 1,
                            image: image.to_string(),
                            minor_axis_length: region.minor_axis_length,
                            filled_area: region.filled_area,
                            perimeter: region.perimeter,
                        });
                    }
                }
            }
            SectionMeasurements::StainedArea {
                stained_area,
                overall_area,
            } => {
                *overall_area += section_area;
                *stained_area += result.stained_area();
            }
        }
    }

    /// Overall tissue area, in pixels.
    pub fn overall_area(&self) -> u64 {
        match self {
            SectionMeasurements::Vessels {
                overall_section_area, ..
            } => *overall_section_area,
            SectionMeasurements::StainedArea { overall_area, .. } => *overall_area,
        }
    }
}

/// Report of one section directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    /// Section name, `<slide>/<side>`
    pub section: String,
    pub stain: Stain,
    pub section_detector: String,
    pub um_per_pixel: f64,
    pub images: usize,
    pub skipped_images: usize,
    pub measurements: SectionMeasurements,
}

impl SectionReport {
    /// Area of one pixel in square micrometers.
    pub fn pixel_area_um2(&self) -> f64 {
        self.um_per_pixel * self.um_per_pixel
    }
}

// =============================================================================
// Writers
// =============================================================================

/// Persists section reports.
pub trait ReportWriter {
    /// Write the report of the section at `section_dir`, returning the written path.
    fn write(&self, section_dir: &Path, report: &SectionReport) -> Result<PathBuf, BatchError>;
}

/// Writes `data.json` next to the section images.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportWriter;

impl ReportWriter for JsonReportWriter {
    fn write(&self, section_dir: &Path, report: &SectionReport) -> Result<PathBuf, BatchError> {
        let path = section_dir.join(REPORT_FILE_NAME);
        let file = File::create(&path).map_err(|e| BatchError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report).map_err(|e| BatchError::Report(e.to_string()))?;
        writer.flush().map_err(|e| BatchError::io(&path, e))?;
        Ok(path)
    }
}

// =============================================================================
// Tests
// =============================================================================
