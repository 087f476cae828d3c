//! Multi-resolution coordinate mapping.
//!
//! Slides are pyramids of power-of-two downsamples: one pixel at level `L`
//! covers a `2^L x 2^L` block at level 0. Boxes are found on a cheap
//! thumbnail level and mapped back to level-0 regions for re-extraction:
//!
//! ```text
//!   level 0  ┌──────────────────────────────────────┐
//!            │        origin = min << source        │
//!            │        ┌───────────┐                 │
//!            │        │ box << src│  ◄── tile grid  │
//!            │        └───────────┘      (level 0)  │
//!            └──────────────────────────────────────┘
//!                          ▲
//!                          │ << source level
//!   level L  ┌──────────┐  │
//!            │  ┌──┐    │──┘
//!            │  └──┘ box│
//!            └──────────┘
//! ```
//!
//! Everything here is integer arithmetic on slide dimensions; no pixels are
//! read. Requests that would leave the slide are reported as
//! [`GeometryError::OutOfBounds`] instead of being clamped.

use crate::error::GeometryError;
use crate::raster::BoundingBox;

/// Number of pyramid levels considered when choosing a read level.
pub const MAX_PYRAMID_LEVELS: u32 = 10;

// =============================================================================
// Selection Box
// =============================================================================

/// Half-open rectangle in the coordinates of some pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl SelectionBox {
    /// Create a box, rejecting empty rectangles.
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Result<Self, GeometryError> {
        if max_x <= min_x || max_y <= min_y {
            return Err(GeometryError::EmptyBox {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Convert a region bounding box (row/column convention).
    pub fn from_bbox(bbox: &BoundingBox) -> Result<Self, GeometryError> {
        Self::new(bbox.min_col, bbox.min_row, bbox.max_col, bbox.max_row)
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    /// Level-0 origin of a box expressed at `level`.
    pub fn origin_level0(&self, level: u32) -> (u64, u64) {
        ((self.min_x as u64) << level, (self.min_y as u64) << level)
    }

    /// Level-0 extent of a box expressed at `level`.
    pub fn size_level0(&self, level: u32) -> (u64, u64) {
        ((self.width() as u64) << level, (self.height() as u64) << level)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Thumbnail level chosen for a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailLevel {
    /// Larger thumbnail dimension, in pixels at `level`
    pub size: u64,
    pub level: u32,
}

/// A pixel read: level-0 origin, read level and size at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRequest {
    pub origin: (u64, u64),
    pub level: u32,
    pub size: (u32, u32),
}

impl RegionRequest {
    /// Pixel count of the request at its read level.
    pub fn area(&self) -> u64 {
        self.size.0 as u64 * self.size.1 as u64
    }
}

/// One cell of a tile grid over a selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub x_index: u32,
    pub y_index: u32,
    pub region: RegionRequest,
}

// =============================================================================
// Slide Geometry
// =============================================================================

/// Level-0 dimensions of a slide and the mappings derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideGeometry {
    pub width: u64,
    pub height: u64,
}

impl SlideGeometry {
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Dimensions of a level: `floor(dim / 2^level)`.
    pub fn level_dimensions(&self, level: u32) -> (u64, u64) {
        (self.width >> level, self.height >> level)
    }

    /// Choose the finest level whose larger dimension is strictly under `max_dim`.
    ///
    /// For a 40000 x 30000 slide and a cap of 4000 this is level 4 (2500 px).
    pub fn choose_thumbnail_level(&self, max_dim: u32) -> Result<ThumbnailLevel, GeometryError> {
        let extent = self.width.max(self.height);
        (0..MAX_PYRAMID_LEVELS)
            .find(|&level| extent < (max_dim as u64) << level)
            .map(|level| ThumbnailLevel {
                size: extent >> level,
                level,
            })
            .ok_or(GeometryError::NoLevelFits {
                extent,
                max_dim,
                levels: MAX_PYRAMID_LEVELS,
            })
    }

    /// Map a box found at `source_level` to a read just fine enough for review.
    ///
    /// The read level is the finest level at which the box's larger side is
    /// strictly under `target_max_dim`. Sizes are truncated, never rounded up.
    pub fn box_to_region(
        &self,
        selection: &SelectionBox,
        source_level: u32,
        target_max_dim: u32,
    ) -> Result<RegionRequest, GeometryError> {
        let (full_w, full_h) = selection.size_level0(source_level);
        let extent = full_w.max(full_h);
        let level = (0..MAX_PYRAMID_LEVELS)
            .find(|&level| extent < (target_max_dim as u64) << level)
            .ok_or(GeometryError::NoLevelFits {
                extent,
                max_dim: target_max_dim,
                levels: MAX_PYRAMID_LEVELS,
            })?;

        let origin = selection.origin_level0(source_level);
        let size = (full_w >> level, full_h >> level);
        self.request(origin, level, size)
    }

    /// Level-0 region of cell `(x_index, y_index)` in an `n_slices x n_slices` grid.
    ///
    /// Cell sizes are truncated, so cells never overlap and the last row and
    /// column may leave a sliver of the box uncovered.
    pub fn tile_region(
        &self,
        selection: &SelectionBox,
        source_level: u32,
        n_slices: u32,
        x_index: u32,
        y_index: u32,
    ) -> Result<RegionRequest, GeometryError> {
        if n_slices == 0 || x_index >= n_slices || y_index >= n_slices {
            return Err(GeometryError::InvalidGrid {
                n_slices,
                x_index,
                y_index,
            });
        }
        let (full_w, full_h) = selection.size_level0(source_level);
        let (box_x, box_y) = selection.origin_level0(source_level);

        let tile_w = full_w / n_slices as u64;
        let tile_h = full_h / n_slices as u64;
        let origin = (box_x + x_index as u64 * tile_w, box_y + y_index as u64 * tile_h);
        self.request(origin, 0, (tile_w, tile_h))
    }

    /// All cells of the grid, `x_index` outermost.
    pub fn tile_grid(
        &self,
        selection: &SelectionBox,
        source_level: u32,
        n_slices: u32,
    ) -> Result<Vec<TileRequest>, GeometryError> {
        let mut tiles = Vec::with_capacity((n_slices * n_slices) as usize);
        for x_index in 0..n_slices {
            for y_index in 0..n_slices {
                let region = self.tile_region(selection, source_level, n_slices, x_index, y_index)?;
                tiles.push(TileRequest {
                    x_index,
                    y_index,
                    region,
                });
            }
        }
        Ok(tiles)
    }

    /// Verify that a request lies inside its level.
    pub fn check_region(&self, region: &RegionRequest) -> Result<(), GeometryError> {
        let (w, h) = (region.size.0 as u64, region.size.1 as u64);
        if region.level >= u64::BITS {
            return Err(self.out_of_bounds(region.origin, region.level, (w, h)));
        }
        let (level_w, level_h) = self.level_dimensions(region.level);
        let x = region.origin.0 >> region.level;
        let y = region.origin.1 >> region.level;
        if x + w > level_w || y + h > level_h {
            return Err(self.out_of_bounds(region.origin, region.level, (w, h)));
        }
        Ok(())
    }

    fn request(&self, origin: (u64, u64), level: u32, size: (u64, u64)) -> Result<RegionRequest, GeometryError> {
        let width = u32::try_from(size.0).map_err(|_| self.out_of_bounds(origin, level, size))?;
        let height = u32::try_from(size.1).map_err(|_| self.out_of_bounds(origin, level, size))?;
        let region = RegionRequest {
            origin,
            level,
            size: (width, height),
        };
        self.check_region(&region)?;
        Ok(region)
    }

    fn out_of_bounds(&self, origin: (u64, u64), level: u32, size: (u64, u64)) -> GeometryError {
        GeometryError::OutOfBounds {
            x: origin.0,
            y: origin.1,
            width: size.0,
            height: size.1,
            level,
            slide_width: self.width,
            slide_height: self.height,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
