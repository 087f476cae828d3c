//! Slide abstraction layer.
//!
//! This module provides a resolution-aware view of Whole Slide Images and the
//! coordinate mapping between their pyramid levels.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Extraction driver            │
//! └────────────────────┬────────────────────┘
//!                      │ boxes, tile grids
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             SlideGeometry               │
//! │  (thumbnail level, box → region, tiles) │
//! └────────────────────┬────────────────────┘
//!                      │ RegionRequest
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           SlideSource Trait             │
//! │   (dimensions + read_region at level)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!            ┌───────────────────┐
//!            │    ImageSlide     │
//!            │ (raster + levels) │
//!            └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wsi_vessels::slide::{ImageSlide, SelectionBox, SlideSource};
//!
//! let slide = ImageSlide::open("slides/sample.tif")?;
//! let (thumbnail, level) = slide.thumbnail(4000)?;
//!
//! let selection = SelectionBox::new(120, 80, 620, 480)?;
//! for tile in slide.geometry().tile_grid(&selection, level.level, 4)? {
//!     let pixels = slide.read_request(&tile.region)?;
//! }
//! ```

mod geometry;
mod image_slide;
mod source;

pub use geometry::{
    RegionRequest, SelectionBox, SlideGeometry, ThumbnailLevel, TileRequest, MAX_PYRAMID_LEVELS,
};
pub use image_slide::{ImageSlide, DEFAULT_LEVEL_CACHE_CAPACITY};
pub use source::SlideSource;
