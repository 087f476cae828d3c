//! Section processing.
//!
//! Walks an extraction tree, segments every raw tile of every section with
//! the chosen stain strategy, writes overlays for visual review and one
//! report per section:
//!
//! ```text
//! <root>/<slide>/<side>/Raw_images/*.png        (input)
//! <root>/<slide>/<side>/Processed_images/*.png  (overlays)
//! <root>/<slide>/<side>/data.json               (report)
//! ```
//!
//! Each image is loaded, processed and released before the next one is
//! read. An image that cannot be decoded or segmented is logged and skipped
//! without aborting the section.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::error::BatchError;
use crate::raster::count_foreground;
use crate::segment::{SectionDetector, Segmenter, Stain, StainResult};

use super::extract::RAW_IMAGES_DIR;
use super::progress::{Progress, Stage};
use super::report::{ReportWriter, SectionMeasurements, SectionReport};

/// Directory receiving the overlays of a section.
pub const PROCESSED_IMAGES_DIR: &str = "Processed_images";

/// Default pixel size, in micrometers per pixel side.
pub const DEFAULT_UM_PER_PIXEL: f64 = 0.221;

/// Processing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessOptions {
    pub stain: Stain,
    pub detector: SectionDetector,
    pub um_per_pixel: f64,
}

impl ProcessOptions {
    pub fn new(stain: Stain) -> Self {
        Self {
            stain,
            detector: SectionDetector::default(),
            um_per_pixel: DEFAULT_UM_PER_PIXEL,
        }
    }
}

/// Counters of a processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub sections: usize,
    pub images: usize,
    pub skipped_images: usize,
}

/// Outcome of one image.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub result: StainResult,
    pub overlay: RgbImage,
    /// Tissue area found by the section detector, in pixels
    pub section_area: u64,
}

fn has_png(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|entry| is_png(&entry.path()))
        })
        .unwrap_or(false)
}

fn is_png(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BatchError::io(dir, e))? {
        let path = entry.map_err(|e| BatchError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Section directories (`<root>/<slide>/<side>`) holding raw PNG tiles, sorted.
pub fn find_section_dirs(root: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut sections = Vec::new();
    for slide_dir in subdirectories(root)? {
        for side_dir in subdirectories(&slide_dir)? {
            if has_png(&side_dir.join(RAW_IMAGES_DIR)) {
                sections.push(side_dir);
            }
        }
    }
    Ok(sections)
}

/// Raw PNG tiles of a section, sorted by name.
pub fn raw_images(section_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let raw_dir = section_dir.join(RAW_IMAGES_DIR);
    let mut images = Vec::new();
    for entry in fs::read_dir(&raw_dir).map_err(|e| BatchError::io(&raw_dir, e))? {
        let path = entry.map_err(|e| BatchError::io(&raw_dir, e))?.path();
        if is_png(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Segment one image and render its overlay.
pub fn process_image(image: &RgbImage, options: &ProcessOptions) -> Result<ImageOutcome, BatchError> {
    let section_area = count_foreground(&options.detector.detect(image)?);
    let segmenter = Segmenter::new(options.stain);
    let result = segmenter.segment(image)?;
    let overlay = segmenter.overlay(image, &result)?;
    Ok(ImageOutcome {
        result,
        overlay,
        section_area,
    })
}

/// Process every raw tile of a section and write its report.
pub fn process_section(
    section_dir: &Path,
    options: &ProcessOptions,
    writer: &dyn ReportWriter,
    progress: &mut dyn Progress,
) -> Result<SectionReport, BatchError> {
    let images = raw_images(section_dir)?;
    let processed_dir = section_dir.join(PROCESSED_IMAGES_DIR);
    fs::create_dir_all(&processed_dir).map_err(|e| BatchError::io(&processed_dir, e))?;

    let mut measurements = SectionMeasurements::for_stain(options.stain);
    let mut skipped = 0;

    for (i, path) in images.iter().enumerate() {
        progress.on_progress(Stage::Processing, i, images.len());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let outcome = image::open(path)
            .map_err(|e| BatchError::image(path, e))
            .and_then(|decoded| process_image(&decoded.to_rgb8(), options));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(image = %path.display(), error = %e, "skipping image");
                skipped += 1;
                continue;
            }
        };

        let overlay_path = processed_dir.join(&file_name);
        outcome
            .overlay
            .save(&overlay_path)
            .map_err(|e| BatchError::image(&overlay_path, e))?;
        debug!(
            image = %file_name,
            stained = outcome.result.stained_area(),
            section_area = outcome.section_area,
            "processed"
        );
        measurements.add(&file_name, &outcome.result, outcome.section_area);
    }
    progress.on_progress(Stage::Processing, images.len(), images.len());

    let report = SectionReport {
        section: section_name(section_dir),
        stain: options.stain,
        section_detector: options.detector.name().to_string(),
        um_per_pixel: options.um_per_pixel,
        images: images.len() - skipped,
        skipped_images: skipped,
        measurements,
    };
    let path = writer.write(section_dir, &report)?;
    info!(section = %report.section, images = report.images, report = %path.display(), "section done");
    Ok(report)
}

/// Process every section below `root`.
pub fn process_tree(
    root: &Path,
    options: &ProcessOptions,
    writer: &dyn ReportWriter,
    progress: &mut dyn Progress,
) -> Result<ProcessSummary, BatchError> {
    let sections = find_section_dirs(root)?;
    info!(sections = sections.len(), stain = %options.stain, "processing");

    let mut summary = ProcessSummary::default();
    for section_dir in &sections {
        let report = process_section(section_dir, options, writer, progress)?;
        summary.sections += 1;
        summary.images += report.images;
        summary.skipped_images += report.skipped_images;
    }
    Ok(summary)
}

/// `<slide>/<side>` name of a section directory.
fn section_name(section_dir: &Path) -> String {
    let side = section_dir.file_name().map(|n| n.to_string_lossy().into_owned());
    let slide = section_dir
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned());
    match (slide, side) {
        (Some(slide), Some(side)) => format!("{}/{}", slide, side),
        (None, Some(side)) => side,
        _ => section_dir.display().to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::progress::NoProgress;
    use crate::batch::report::JsonReportWriter;
    use image::Rgb;

    /// White tile with a dark block, saved as a raw image of `<root>/slide/Left`.
    fn write_section(root: &Path) -> PathBuf {
        let section = root.join("slide").join("Left");
        let raw = section.join(RAW_IMAGES_DIR);
        fs::create_dir_all(&raw).unwrap();
        let tile = RgbImage::from_fn(80, 80, |x, y| {
            if (20..60).contains(&x) && (20..60).contains(&y) {
                Rgb([100, 100, 100])
            } else {
                Rgb([250, 250, 250])
            }
        });
        tile.save(raw.join("Section_1_1.png")).unwrap();
        section
    }

    #[test]
    fn test_find_section_dirs() {
        let root = tempfile::tempdir().unwrap();
        let section = write_section(root.path());
        fs::create_dir_all(root.path().join("slide").join("Right").join(RAW_IMAGES_DIR)).unwrap();
        fs::create_dir_all(root.path().join("empty")).unwrap();
        assert_eq!(find_section_dirs(root.path()).unwrap(), vec![section]);
    }

    #[test]
    fn test_process_section_mvg() {
        let root = tempfile::tempdir().unwrap();
        let section = write_section(root.path());
        let options = ProcessOptions::new(Stain::MvG);

        let report = process_section(&section, &options, &JsonReportWriter, &mut NoProgress).unwrap();
        assert_eq!(report.section, "slide/Left");
        assert_eq!(report.images, 1);
        match report.measurements {
            SectionMeasurements::StainedArea {
                stained_area,
                overall_area,
            } => {
                assert_eq!(stained_area, 1600);
                assert!(overall_area > 0);
            }
            other => panic!("unexpected measurements {:?}", other),
        }

        let overlay = image::open(section.join(PROCESSED_IMAGES_DIR).join("Section_1_1.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(*overlay.get_pixel(40, 40), Rgb([0, 0, 0]));
        assert_eq!(*overlay.get_pixel(5, 5), Rgb([255, 255, 255]));
        assert!(section.join("data.json").exists());
    }

    #[test]
    fn test_undecodable_image_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let section = write_section(root.path());
        fs::write(section.join(RAW_IMAGES_DIR).join("Section_1_2.png"), b"not a png").unwrap();

        let summary = process_tree(root.path(), &ProcessOptions::new(Stain::Msb), &JsonReportWriter, &mut NoProgress)
            .unwrap();
        assert_eq!(summary.sections, 1);
        assert_eq!(summary.images, 1);
        assert_eq!(summary.skipped_images, 1);
    }

    #[test]
    fn test_section_name() {
        assert_eq!(section_name(Path::new("/data/slide_a/Center")), "slide_a/Center");
    }
}
