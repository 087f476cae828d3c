//! Test utilities for integration tests.
//!
//! This module provides builders for synthetic section images and slides.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Stain color of vessel walls: high inverted Cb, low inverted Cr.
pub const VESSEL: Rgb<u8> = Rgb([200, 150, 50]);

/// Green band giving the chroma channels a second population.
pub const DECOY: Rgb<u8> = Rgb([50, 200, 50]);

/// Bright glass background.
pub const GLASS: Rgb<u8> = Rgb([255, 255, 255]);

/// Dark purple tissue.
pub const TISSUE: Rgba<u8> = Rgba([120, 60, 140, 255]);

/// Slightly off-white slide background.
pub const SLIDE_BACKGROUND: Rgba<u8> = Rgba([248, 248, 248, 255]);

/// A ring (or a disk when `inner` is 0) centered at `(cx, cy)`.
#[derive(Debug, Clone, Copy)]
pub struct Ring {
    pub cx: f64,
    pub cy: f64,
    pub outer: f64,
    pub inner: f64,
}

impl Ring {
    pub fn new(cx: f64, cy: f64, outer: f64, inner: f64) -> Self {
        Self { cx, cy, outer, inner }
    }

    pub fn disk(cx: f64, cy: f64, radius: f64) -> Self {
        Self::new(cx, cy, radius, 0.0)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        let (dx, dy) = (x as f64 - self.cx, y as f64 - self.cy);
        let d2 = dx * dx + dy * dy;
        d2 <= self.outer * self.outer && (self.inner == 0.0 || d2 > self.inner * self.inner)
    }
}

/// Square section image: glass, a decoy band along the left edge and stained shapes.
pub fn vessel_scene(size: u32, shapes: &[Ring]) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        if x < size / 10 {
            DECOY
        } else if shapes.iter().any(|s| s.contains(x, y)) {
            VESSEL
        } else {
            GLASS
        }
    })
}

/// Slide with rectangular tissue blocks `(x0, y0, x1, y1)` in level-0 pixels.
pub fn slide_with_sections(width: u32, height: u32, blocks: &[(u32, u32, u32, u32)]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = blocks
            .iter()
            .any(|&(x0, y0, x1, y1)| x >= x0 && x < x1 && y >= y0 && y < y1);
        if inside {
            TISSUE
        } else {
            SLIDE_BACKGROUND
        }
    })
}

/// Horizontal/vertical gradient, so every pixel encodes its own position.
pub fn coordinate_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 251) as u8, (y % 251) as u8, 0, 255]))
}
