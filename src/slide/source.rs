//! SlideSource trait for resolution-aware slide access.
//!
//! This module defines the `SlideSource` trait, the only view of a slide the
//! extraction driver needs: level-0 dimensions and region reads at a
//! power-of-two level.
//!
//! # Usage
//!
//! The trait is implemented by [`crate::slide::ImageSlide`] for plain raster
//! files. Readers for vendor pyramids only have to provide
//! [`dimensions`](SlideSource::dimensions) and
//! [`read_region`](SlideSource::read_region); thumbnails and geometry come
//! from the provided methods.

use image::{DynamicImage, RgbImage, RgbaImage};

use crate::error::SlideError;

use super::geometry::{RegionRequest, SlideGeometry, ThumbnailLevel, MAX_PYRAMID_LEVELS};

// =============================================================================
// SlideSource Trait
// =============================================================================

/// Format-agnostic interface for reading pixels from a Whole Slide Image.
///
/// Level `L` is the level-0 image downsampled by `2^L` in each direction.
/// Region origins are always given in level-0 coordinates, sizes in pixels
/// of the read level.
pub trait SlideSource {
    /// Get dimensions of the full-resolution (level 0) image.
    fn dimensions(&self) -> (u32, u32);

    /// Read a region.
    ///
    /// # Arguments
    ///
    /// * `origin` - Top-left corner in level-0 pixels
    /// * `level` - Pyramid level to read from (0 = full resolution)
    /// * `size` - Width and height in pixels at `level`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Level is out of range
    /// - The region falls outside the level
    /// - Pixel data cannot be decoded
    fn read_region(&self, origin: (u64, u64), level: u32, size: (u32, u32)) -> Result<RgbaImage, SlideError>;

    /// Get the number of pyramid levels.
    fn level_count(&self) -> u32 {
        MAX_PYRAMID_LEVELS
    }

    /// Get dimensions of a specific level.
    ///
    /// Returns `None` if level is out of range.
    fn level_dimensions(&self, level: u32) -> Option<(u32, u32)> {
        if level >= self.level_count() {
            return None;
        }
        let (width, height) = self.dimensions();
        Some((width >> level, height >> level))
    }

    /// Level-0 geometry used for coordinate mapping.
    fn geometry(&self) -> SlideGeometry {
        let (width, height) = self.dimensions();
        SlideGeometry::new(width as u64, height as u64)
    }

    /// Read a planned region as RGB, dropping the alpha channel.
    fn read_request(&self, request: &RegionRequest) -> Result<RgbImage, SlideError> {
        let rgba = self.read_region(request.origin, request.level, request.size)?;
        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }

    /// Read the whole slide at the finest level under `max_dim`.
    fn thumbnail(&self, max_dim: u32) -> Result<(RgbImage, ThumbnailLevel), SlideError> {
        let thumb = self.geometry().choose_thumbnail_level(max_dim)?;
        let size = self
            .level_dimensions(thumb.level)
            .ok_or(SlideError::InvalidLevel {
                level: thumb.level,
                max_levels: self.level_count(),
            })?;
        let request = RegionRequest {
            origin: (0, 0),
            level: thumb.level,
            size,
        };
        Ok((self.read_request(&request)?, thumb))
    }
}
