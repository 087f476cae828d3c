//! Integration tests for multi-resolution coordinate mapping.
//!
//! These tests verify:
//! - Thumbnail level choice on slide-sized geometries
//! - Box-to-region mapping and its level choice
//! - Tile grids read back from an image-backed slide land on the right pixels

use wsi_vessels::slide::{SelectionBox, SlideGeometry, SlideSource};
use wsi_vessels::{GeometryError, ImageSlide, SlideError};

use super::test_utils::coordinate_image;

// =============================================================================
// Pure Geometry
// =============================================================================

#[test]
fn test_thumbnail_level_for_large_slide() {
    let geometry = SlideGeometry::new(40000, 30000);
    let thumb = geometry.choose_thumbnail_level(4000).unwrap();
    assert_eq!((thumb.level, thumb.size), (4, 2500));

    // Always strictly under the cap, and the level above would not be
    for max_dim in [100, 1000, 2500, 2501, 5000, 40001] {
        let thumb = geometry.choose_thumbnail_level(max_dim).unwrap();
        assert!(thumb.size < max_dim as u64);
        if thumb.level > 0 {
            assert!(40000 >> (thumb.level - 1) >= max_dim as u64);
        }
    }
}

#[test]
fn test_box_to_region_levels() {
    let geometry = SlideGeometry::new(16000, 16000);
    let selection = SelectionBox::new(0, 0, 1000, 1000).unwrap();

    let region = geometry.box_to_region(&selection, 4, 10000).unwrap();
    assert_eq!((region.level, region.size), (1, (8000, 8000)));

    let region = geometry.box_to_region(&selection, 4, 16001).unwrap();
    assert_eq!((region.level, region.size), (0, (16000, 16000)));
    assert_eq!(region.origin, (0, 0));
}

#[test]
fn test_tile_grid_covers_box_without_overlap() {
    let geometry = SlideGeometry::new(40000, 30000);
    let selection = SelectionBox::new(101, 57, 1478, 913).unwrap();
    let n = 4;
    let tiles = geometry.tile_grid(&selection, 3, n).unwrap();
    assert_eq!(tiles.len(), 16);

    let (box_x, box_y) = selection.origin_level0(3);
    let (box_w, box_h) = selection.size_level0(3);
    let (tile_w, tile_h) = tiles[0].region.size;

    for tile in &tiles {
        assert_eq!(tile.region.level, 0);
        assert_eq!(tile.region.size, (tile_w, tile_h));
        let (x, y) = tile.region.origin;
        assert_eq!(x, box_x + tile.x_index as u64 * tile_w as u64);
        assert_eq!(y, box_y + tile.y_index as u64 * tile_h as u64);
        assert!(x + (tile_w as u64) <= box_x + box_w);
        assert!(y + (tile_h as u64) <= box_y + box_h);
    }

    // Truncation leaves less than one pixel per cell along each axis
    assert!(box_w - n as u64 * (tile_w as u64) < (n as u64));
    assert!(box_h - n as u64 * (tile_h as u64) < (n as u64));
}

// =============================================================================
// Slide Reads
// =============================================================================

#[test]
fn test_tiles_read_from_slide_match_level0_pixels() {
    let image = coordinate_image(640, 480);
    let slide = ImageSlide::from_image(image.clone());
    let (thumbnail, level) = slide.thumbnail(200).unwrap();
    assert_eq!(level.level, 2);
    assert_eq!(thumbnail.dimensions(), (160, 120));

    let selection = SelectionBox::new(20, 10, 120, 90).unwrap();
    for tile in slide.geometry().tile_grid(&selection, level.level, 2).unwrap() {
        let pixels = slide.read_request(&tile.region).unwrap();
        assert_eq!(pixels.dimensions(), (200, 160));
        let (x0, y0) = (tile.region.origin.0 as u32, tile.region.origin.1 as u32);
        for (x, y) in [(0, 0), (199, 0), (0, 159), (123, 45)] {
            let expected = image.get_pixel(x0 + x, y0 + y);
            let actual = pixels.get_pixel(x, y);
            assert_eq!(actual.0[..], expected.0[..3]);
        }
    }
}

#[test]
fn test_box_region_read_is_downsampled() {
    let slide = ImageSlide::from_image(coordinate_image(1024, 1024));
    let selection = SelectionBox::new(0, 0, 64, 64).unwrap();
    let region = slide.geometry().box_to_region(&selection, 2, 200).unwrap();
    assert_eq!((region.level, region.size), (1, (128, 128)));
    let pixels = slide.read_request(&region).unwrap();
    assert_eq!(pixels.dimensions(), (128, 128));
}

#[test]
fn test_region_outside_slide_is_an_error() {
    let slide = ImageSlide::from_image(coordinate_image(100, 100));
    let selection = SelectionBox::new(10, 10, 40, 40).unwrap();
    // Box given at level 2 maps to 40..160 at level 0, beyond the slide
    let err = slide.geometry().tile_region(&selection, 2, 2, 1, 1).unwrap_err();
    assert!(matches!(err, GeometryError::OutOfBounds { .. }));

    let err = slide.read_region((90, 90), 0, (20, 20)).unwrap_err();
    assert!(matches!(err, SlideError::Geometry(GeometryError::OutOfBounds { .. })));
}
