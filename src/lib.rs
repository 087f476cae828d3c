//! # WSI Vessels
//!
//! Section extraction and morphological segmentation for Whole Slide Images
//! (WSI) of histology slides.
//!
//! The library turns a raw color image into labeled, size-filtered,
//! hole-aware objects, and maps detections made on a low-resolution
//! thumbnail back to exact full-resolution regions for re-extraction.
//!
//! ## Features
//!
//! - **Section detection**: tissue versus glass masks, by threshold or band-pass
//! - **Vessel segmentation**: chroma masks, lumen recovery, area filtering and
//!   per-vessel measurements (minor axis, filled area, perimeter)
//! - **Stain strategies**: stained-area quantification for Alcian blue, MSB,
//!   MvG, Laminin and S100
//! - **Multi-resolution mapping**: thumbnail level choice, box-to-region
//!   mapping and tile grids at full resolution
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`raster`] - Pixel operations: filters, normalization, morphology, labeling, region properties
//! - [`segment`] - Section detection, vessel pipeline and stain strategies
//! - [`slide`] - Slide abstraction and coordinate mapping between pyramid levels
//! - [`batch`] - Extraction and processing drivers, selection, reports
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_vessels::{Segmenter, Stain, StainResult};
//!
//! let image = image::open("tile.png").unwrap().to_rgb8();
//! match Segmenter::new(Stain::BloodVessel).segment(&image).unwrap() {
//!     StainResult::Objects(vessels) => println!("{} vessel(s)", vessels.len()),
//!     StainResult::Area(mask) => println!("{} stained pixel(s)", mask.len()),
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod raster;
pub mod segment;
pub mod slide;

// Re-export commonly used types
pub use config::{Cli, Command, ExtractConfig, ProcessConfig};
pub use error::{BatchError, GeometryError, SegmentError, SlideError};
pub use raster::{LabelMap, RegionProps};
pub use segment::{segment_vessels, SectionDetector, Segmentation, Segmenter, Stain, StainResult};
pub use slide::{ImageSlide, RegionRequest, SelectionBox, SlideGeometry, SlideSource, ThumbnailLevel};
