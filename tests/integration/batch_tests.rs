//! Integration tests for the batch drivers.
//!
//! These tests verify:
//! - Automatic extraction writes the expected directory layout
//! - Manual boxes override automatic selection
//! - Processing writes overlays and a report per section
//! - Unreadable slides are skipped without aborting the run

use std::fs;
use std::path::Path;

use wsi_vessels::batch::extract::RAW_IMAGES_DIR;
use wsi_vessels::batch::process::PROCESSED_IMAGES_DIR;
use wsi_vessels::batch::report::REPORT_FILE_NAME;
use wsi_vessels::batch::{
    extract_directory, process_tree, AutoSectionSelector, ExtractOptions, FixedSelection, JsonReportWriter,
    NoProgress, ProcessOptions, SectionMeasurements, SectionReport, Stage,
};
use wsi_vessels::{SelectionBox, Stain};

use super::test_utils::slide_with_sections;

fn write_slide(dir: &Path, name: &str) {
    slide_with_sections(1200, 600, &[(100, 150, 400, 450), (700, 100, 1100, 500)])
        .save(dir.join(name))
        .unwrap();
}

fn options() -> ExtractOptions {
    ExtractOptions {
        thumbnail_max: 500,
        tiles_per_side: 2,
    }
}

fn png_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().map(|ext| ext == "png").unwrap_or(false))
        .count()
}

#[test]
fn test_auto_extraction_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_slide(dir.path(), "slide.png");

    let mut stages = Vec::new();
    let mut progress = |stage: Stage, _current: usize, _total: usize| stages.push(stage);
    let summary = extract_directory(dir.path(), &options(), &mut AutoSectionSelector::default(), &mut progress).unwrap();

    assert_eq!(summary.slides, 1);
    assert_eq!(summary.sections, 2);
    assert_eq!(summary.tiles, 8);
    assert_eq!(summary.skipped_slides, 0);

    let slide_dir = dir.path().join("slide");
    for side in ["Left", "Center"] {
        let raw = slide_dir.join(side).join(RAW_IMAGES_DIR);
        assert_eq!(png_count(&raw), 4, "{}", side);
        assert!(raw.join("Section_2_2.png").exists());
    }
    assert!(!slide_dir.join("Right").exists());
    assert!(stages.contains(&Stage::Selection));
    assert!(stages.contains(&Stage::Extraction));
}

#[test]
fn test_manual_boxes() {
    let dir = tempfile::tempdir().unwrap();
    write_slide(dir.path(), "slide.png");

    // Thumbnail is 300 x 150 at level 2
    let boxes = vec![SelectionBox::new(0, 0, 100, 100).unwrap()];
    let summary = extract_directory(dir.path(), &options(), &mut FixedSelection::new(boxes), &mut NoProgress).unwrap();
    assert_eq!(summary.sections, 1);

    let tile = image::open(dir.path().join("slide/Left").join(RAW_IMAGES_DIR).join("Section_1_1.png")).unwrap();
    assert_eq!((tile.width(), tile.height()), (200, 200));
}

#[test]
fn test_unreadable_slide_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_slide(dir.path(), "good.png");
    fs::write(dir.path().join("broken.tif"), b"not a tiff").unwrap();

    let summary = extract_directory(dir.path(), &options(), &mut AutoSectionSelector::default(), &mut NoProgress).unwrap();
    assert_eq!(summary.slides, 1);
    assert_eq!(summary.skipped_slides, 1);
    assert!(dir.path().join("good").is_dir());
    assert!(!dir.path().join("broken").exists());
}

#[test]
fn test_extract_then_process() {
    let dir = tempfile::tempdir().unwrap();
    write_slide(dir.path(), "slide.png");
    extract_directory(dir.path(), &options(), &mut AutoSectionSelector::default(), &mut NoProgress).unwrap();

    let summary = process_tree(dir.path(), &ProcessOptions::new(Stain::MvG), &JsonReportWriter, &mut NoProgress).unwrap();
    assert_eq!(summary.sections, 2);
    assert_eq!(summary.images, 8);
    assert_eq!(summary.skipped_images, 0);

    let section = dir.path().join("slide").join("Left");
    assert_eq!(png_count(&section.join(PROCESSED_IMAGES_DIR)), 4);

    let json = fs::read_to_string(section.join(REPORT_FILE_NAME)).unwrap();
    let report: SectionReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report.section, "slide/Left");
    assert_eq!(report.stain, Stain::MvG);
    assert_eq!(report.images, 4);
    match report.measurements {
        SectionMeasurements::StainedArea {
            stained_area,
            overall_area,
        } => {
            assert!(stained_area > 0);
            assert!(overall_area > 0);
        }
        other => panic!("unexpected measurements {:?}", other),
    }
}

#[test]
fn test_process_vessels_report_shape() {
    let dir = tempfile::tempdir().unwrap();
    write_slide(dir.path(), "slide.png");
    extract_directory(dir.path(), &options(), &mut AutoSectionSelector::default(), &mut NoProgress).unwrap();

    process_tree(dir.path(), &ProcessOptions::new(Stain::BloodVessel), &JsonReportWriter, &mut NoProgress).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("slide/Center").join(REPORT_FILE_NAME)).unwrap())
            .unwrap();
    assert_eq!(json["measurements"]["kind"], "vessels");
    assert!(json["measurements"]["vessels"].is_array());
    assert!(json["measurements"]["overallSectionArea"].as_u64().unwrap() > 0);
}
