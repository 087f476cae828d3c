//! Integration tests for the segmentation pipeline.
//!
//! These tests verify:
//! - The ring-and-disk scenario: one filled vessel survives
//! - Empty results on images without chroma signal
//! - Binary section masks
//! - Label compaction properties on real label maps

use std::f64::consts::PI;

use image::{Rgb, RgbImage};

use wsi_vessels::raster::{compact, count_foreground, is_binary_mask, label, region_props, Connectivity};
use wsi_vessels::segment::vessels::{base_mask, MIN_OBJECT_AREA};
use wsi_vessels::{segment_vessels, SectionDetector, Segmenter, Stain, StainResult};

use super::test_utils::{vessel_scene, Ring};

/// Ring of outer radius 40 and lumen radius 15, plus a disk of area ~100.
fn ring_and_disk() -> RgbImage {
    vessel_scene(
        1000,
        &[
            Ring::new(500.0, 500.0, 40.0, 15.0),
            Ring::disk(700.0, 500.0, (100.0 / PI).sqrt()),
        ],
    )
}

// =============================================================================
// Vessel Segmentation
// =============================================================================

#[test]
fn test_ring_is_filled_and_disk_filtered() {
    let image = ring_and_disk();
    let seg = segment_vessels(&image).unwrap();

    assert_eq!(seg.len(), 1, "regions: {:?}", seg.regions);
    let vessel = &seg.regions[0];
    assert_eq!(vessel.label, 1);
    assert_eq!(vessel.euler_number, 1);

    let expected = PI * 40.0 * 40.0;
    let filled = vessel.filled_area as f64;
    assert!((filled - expected).abs() < 0.1 * expected, "filled area {}", filled);

    // The vessel sits where the ring was, not where the disk was
    let (row, col) = vessel.centroid;
    assert!((row - 500.0).abs() < 3.0 && (col - 500.0).abs() < 3.0);
    assert_eq!(seg.labels.get(700, 500), 0);
    assert_ne!(seg.labels.get(500, 500), 0);
}

#[test]
fn test_ring_has_hole_before_filling() {
    let mask = base_mask(&ring_and_disk()).unwrap();
    let labels = label(&mask, Connectivity::Eight);
    let regions = region_props(&labels);
    assert_eq!(regions.len(), 2);

    let ring = regions.iter().max_by_key(|r| r.area).unwrap();
    assert_eq!(ring.euler_number, 0);
    assert!(ring.has_hole());
    assert!(ring.filled_area > ring.area);

    let disk = regions.iter().min_by_key(|r| r.area).unwrap();
    assert!(disk.filled_area < MIN_OBJECT_AREA);
}

#[test]
fn test_uniform_image_yields_empty_labels() {
    let image = RgbImage::from_pixel(256, 256, Rgb([180, 120, 90]));
    let seg = segment_vessels(&image).unwrap();
    assert!(seg.is_empty());
    assert_eq!(seg.labels.max_label(), 0);
}

#[test]
fn test_vessel_overlay_outlines_in_green() {
    let image = ring_and_disk();
    let segmenter = Segmenter::new(Stain::BloodVessel);
    let result = segmenter.segment(&image).unwrap();
    let overlay = segmenter.overlay(&image, &result).unwrap();

    let green = overlay.pixels().filter(|p| **p == Rgb([0, 255, 0])).count();
    assert!(green > 100);
    // Interior and far background are left untouched
    assert_eq!(*overlay.get_pixel(500, 520), *image.get_pixel(500, 520));
    assert_eq!(*overlay.get_pixel(900, 900), *image.get_pixel(900, 900));
    assert!(matches!(result, StainResult::Objects(_)));
}

// =============================================================================
// Section Detection
// =============================================================================

#[test]
fn test_section_masks_are_binary() {
    let image = ring_and_disk();
    for detector in [SectionDetector::Threshold, SectionDetector::BandPass] {
        let mask = detector.detect(&image).unwrap();
        assert!(is_binary_mask(&mask), "{} produced grey levels", detector.name());
    }
}

// =============================================================================
// Label Compaction
// =============================================================================

#[test]
fn test_compaction_on_segmented_labels() {
    let image = vessel_scene(
        300,
        &[
            Ring::disk(80.0, 80.0, 10.0),
            Ring::disk(200.0, 80.0, 12.0),
            Ring::disk(150.0, 220.0, 9.0),
        ],
    );
    let labels = label(&base_mask(&image).unwrap(), Connectivity::Eight);
    assert_eq!(labels.max_label(), 3);
    let counts = labels.pixel_counts();

    let keep = [1, 3];
    let once = compact(&labels, &keep);
    assert_eq!(once.labels(), vec![1, 2]);

    let compacted_counts = once.pixel_counts();
    assert_eq!(compacted_counts[1], counts[1]);
    assert_eq!(compacted_counts[2], counts[3]);
    assert_eq!(count_foreground(&once.to_mask()), counts[1] + counts[3]);

    let twice = compact(&once, &[1, 2]);
    assert_eq!(twice, once);
}
