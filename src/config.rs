//! Configuration management for WSI Vessels.
//!
//! This module provides the command-line interface:
//! - Subcommands for the two batch phases (`extract`, `process`)
//! - Environment variables with `WSIV_` prefix as fallbacks
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use wsi_vessels::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Extract(config) => println!("Extracting from {}", config.dir.display()),
//!     Command::Process(config) => println!("Processing {}", config.dir.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `WSIV_DIR` - Working directory (slides for `extract`, extraction tree for `process`)
//! - `WSIV_THUMBNAIL_MAX` - Thumbnail size cap in pixels (default: 4000)
//! - `WSIV_TILES` - Tiles per box side (default: 4)
//! - `WSIV_SECTIONS` - Sections kept per slide by automatic selection (default: 3)
//! - `WSIV_MIN_SECTION_AREA` - Minimum section area in thumbnail pixels (default: 1000)
//! - `WSIV_SECTION_DETECTOR` - `threshold` or `band-pass` (default: threshold)
//! - `WSIV_STAIN` - Stain of the processed images
//! - `WSIV_PIXEL_SIZE` - Micrometers per pixel side (default: 0.221)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::batch::extract::{DEFAULT_THUMBNAIL_MAX, DEFAULT_TILES_PER_SIDE};
use crate::batch::process::DEFAULT_UM_PER_PIXEL;
use crate::batch::selection::{DEFAULT_MAX_SECTIONS, DEFAULT_MIN_SECTION_AREA};
use crate::batch::{AutoSectionSelector, ExtractOptions, FixedSelection, ProcessOptions, SelectionProvider};
use crate::segment::{SectionDetector, Stain};
use crate::slide::SelectionBox;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Vessels - Section extraction and vessel segmentation for Whole Slide Images.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-vessels")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the parsed arguments, returning the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Select sections on slide thumbnails and export them as full-resolution tiles.
    Extract(ExtractConfig),

    /// Segment exported tiles and write overlays and reports.
    Process(ProcessConfig),
}

/// Section detection strategy.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorChoice {
    Threshold,
    BandPass,
}

impl From<DetectorChoice> for SectionDetector {
    fn from(choice: DetectorChoice) -> Self {
        match choice {
            DetectorChoice::Threshold => SectionDetector::Threshold,
            DetectorChoice::BandPass => SectionDetector::BandPass,
        }
    }
}

/// Stain of the processed images.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StainChoice {
    BloodVessels,
    AlcianBlue,
    Laminin,
    Mvg,
    Msb,
    S100,
}

impl From<StainChoice> for Stain {
    fn from(choice: StainChoice) -> Self {
        match choice {
            StainChoice::BloodVessels => Stain::BloodVessel,
            StainChoice::AlcianBlue => Stain::AlcianBlue,
            StainChoice::Laminin => Stain::Laminin,
            StainChoice::Mvg => Stain::MvG,
            StainChoice::Msb => Stain::Msb,
            StainChoice::S100 => Stain::S100,
        }
    }
}

/// Parse a box given as `x0,y0,x1,y1` in thumbnail pixels.
pub fn parse_box(value: &str) -> Result<SelectionBox, String> {
    let coords = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid box '{}': {}", value, e))?;
    match coords.as_slice() {
        &[x0, y0, x1, y1] => SelectionBox::new(x0, y0, x1, y1).map_err(|e| e.to_string()),
        _ => Err(format!("invalid box '{}': expected x0,y0,x1,y1", value)),
    }
}

// =============================================================================
// Extract Command
// =============================================================================

/// Configuration of the `extract` command.
#[derive(Args, Debug, Clone)]
pub struct ExtractConfig {
    /// Directory containing the slide images.
    #[arg(long, env = "WSIV_DIR")]
    pub dir: PathBuf,

    /// Maximum size of the larger thumbnail dimension, in pixels.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_MAX, env = "WSIV_THUMBNAIL_MAX")]
    pub thumbnail_max: u32,

    /// Number of tiles along each side of a selected box.
    #[arg(long, default_value_t = DEFAULT_TILES_PER_SIDE, env = "WSIV_TILES")]
    pub tiles: u32,

    /// Maximum number of sections kept per slide by automatic selection.
    #[arg(long, default_value_t = DEFAULT_MAX_SECTIONS, env = "WSIV_SECTIONS")]
    pub sections: usize,

    /// Minimum area of an automatically selected section, in thumbnail pixels.
    #[arg(long, default_value_t = DEFAULT_MIN_SECTION_AREA, env = "WSIV_MIN_SECTION_AREA")]
    pub min_section_area: u64,

    /// Section detector used by automatic selection.
    #[arg(long, value_enum, default_value_t = DetectorChoice::Threshold, env = "WSIV_SECTION_DETECTOR")]
    pub section_detector: DetectorChoice,

    /// Manual box `x0,y0,x1,y1` in thumbnail pixels (repeatable).
    ///
    /// When given, the same boxes are used for every slide and automatic
    /// selection is disabled.
    #[arg(long = "box", value_parser = parse_box)]
    pub boxes: Vec<SelectionBox>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExtractConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.dir.is_dir() {
            return Err(format!("{} is not a directory", self.dir.display()));
        }
        if self.thumbnail_max == 0 {
            return Err("thumbnail_max must be greater than 0".to_string());
        }
        if self.tiles == 0 {
            return Err("tiles must be greater than 0".to_string());
        }
        if self.boxes.is_empty() && self.sections == 0 {
            return Err("sections must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            thumbnail_max: self.thumbnail_max,
            tiles_per_side: self.tiles,
        }
    }

    /// Manual boxes if any were given, automatic section detection otherwise.
    pub fn selector(&self) -> Box<dyn SelectionProvider> {
        if self.boxes.is_empty() {
            Box::new(AutoSectionSelector {
                detector: self.section_detector.into(),
                max_sections: self.sections,
                min_area: self.min_section_area,
            })
        } else {
            Box::new(FixedSelection::new(self.boxes.clone()))
        }
    }
}

// =============================================================================
// Process Command
// =============================================================================

/// Configuration of the `process` command.
#[derive(Args, Debug, Clone)]
pub struct ProcessConfig {
    /// Root of an extraction tree (`<slide>/<side>/Raw_images`).
    #[arg(long, env = "WSIV_DIR")]
    pub dir: PathBuf,

    /// Stain of the images.
    #[arg(long, value_enum, env = "WSIV_STAIN")]
    pub stain: StainChoice,

    /// Section detector used for the overall tissue area.
    #[arg(long, value_enum, default_value_t = DetectorChoice::Threshold, env = "WSIV_SECTION_DETECTOR")]
    pub section_detector: DetectorChoice,

    /// Pixel size in micrometers, recorded in the reports.
    #[arg(long, default_value_t = DEFAULT_UM_PER_PIXEL, env = "WSIV_PIXEL_SIZE")]
    pub pixel_size: f64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ProcessConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.dir.is_dir() {
            return Err(format!("{} is not a directory", self.dir.display()));
        }
        if !self.pixel_size.is_finite() || self.pixel_size <= 0.0 {
            return Err("pixel_size must be a positive number".to_string());
        }
        Ok(())
    }

    pub fn options(&self) -> ProcessOptions {
        ProcessOptions {
            stain: self.stain.into(),
            detector: self.section_detector.into(),
            um_per_pixel: self.pixel_size,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
