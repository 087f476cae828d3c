//! Two-phase tile extraction.
//!
//! ```text
//!  Phase 1 (selection)                Phase 2 (extraction)
//!  ───────────────────                ────────────────────
//!  for each slide:                    for each slide with boxes:
//!    thumbnail (< thumbnail_max)        for each box:
//!    SelectionProvider::select            n x n tile grid at level 0
//!    keep boxes + thumbnail level         read, save PNG
//! ```
//!
//! All boxes are collected before any full-resolution read, so an
//! interactive provider is never kept waiting on I/O. Each slide is reopened
//! for phase 2 and dropped as soon as its tiles are written.
//!
//! Output layout, next to the slide file:
//!
//! ```text
//! <stem>/<Left|Center|Right|Section_N>/Raw_images/Section_<x+1>_<y+1>.png
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::BatchError;
use crate::slide::{ImageSlide, SelectionBox, SlideSource, ThumbnailLevel, TileRequest};

use super::progress::{Progress, Stage};
use super::selection::{section_dir_name, SelectionProvider};

/// File extensions recognized as slides.
pub const SLIDE_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg"];

/// Directory receiving the extracted tiles of a section.
pub const RAW_IMAGES_DIR: &str = "Raw_images";

/// Default cap on the larger thumbnail dimension.
pub const DEFAULT_THUMBNAIL_MAX: u32 = 4000;

/// Default number of tiles per box side.
pub const DEFAULT_TILES_PER_SIDE: u32 = 4;

/// Extraction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub thumbnail_max: u32,
    pub tiles_per_side: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            thumbnail_max: DEFAULT_THUMBNAIL_MAX,
            tiles_per_side: DEFAULT_TILES_PER_SIDE,
        }
    }
}

/// Counters of an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub slides: usize,
    pub sections: usize,
    pub tiles: usize,
    pub skipped_slides: usize,
}

/// Boxes selected on one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidePlan {
    pub path: PathBuf,
    pub thumbnail: ThumbnailLevel,
    pub boxes: Vec<SelectionBox>,
}

/// Slide files directly inside `dir`, sorted by name.
pub fn find_slides(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let entries = fs::read_dir(dir).map_err(|e| BatchError::io(dir, e))?;
    let mut slides = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| BatchError::io(dir, e))?.path();
        let is_slide = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SLIDE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
        if is_slide {
            slides.push(path);
        }
    }
    slides.sort();
    Ok(slides)
}

/// Phase 1 for one slide: thumbnail and selection.
pub fn plan_slide<S: SlideSource>(
    slide: &S,
    name: &str,
    options: &ExtractOptions,
    selector: &mut dyn SelectionProvider,
) -> Result<(ThumbnailLevel, Vec<SelectionBox>), BatchError> {
    let (thumbnail, level) = slide.thumbnail(options.thumbnail_max)?;
    let boxes = selector.select(name, &thumbnail)?;
    Ok((level, boxes))
}

/// Phase 2 for one slide: write the tile grid of every box under `out_dir`.
///
/// Returns the number of tiles written.
pub fn extract_slide<S: SlideSource>(
    slide: &S,
    thumbnail: ThumbnailLevel,
    boxes: &[SelectionBox],
    out_dir: &Path,
    options: &ExtractOptions,
    progress: &mut dyn Progress,
) -> Result<usize, BatchError> {
    let geometry = slide.geometry();
    let mut written = 0;

    for (index, selection) in boxes.iter().enumerate() {
        let raw_dir = out_dir
            .join(section_dir_name(index, boxes.len()))
            .join(RAW_IMAGES_DIR);
        let tiles = geometry.tile_grid(selection, thumbnail.level, options.tiles_per_side)?;
        fs::create_dir_all(&raw_dir).map_err(|e| BatchError::io(&raw_dir, e))?;

        if let Err(e) = write_tiles(slide, &tiles, &raw_dir, progress) {
            // A partial grid would be picked up as a complete section later
            if let Err(cleanup) = fs::remove_dir_all(&raw_dir) {
                warn!(dir = %raw_dir.display(), error = %cleanup, "failed to remove partial tile grid");
            }
            return Err(e);
        }
        written += tiles.len();
    }
    Ok(written)
}

fn write_tiles<S: SlideSource>(
    slide: &S,
    tiles: &[TileRequest],
    raw_dir: &Path,
    progress: &mut dyn Progress,
) -> Result<(), BatchError> {
    for (k, tile) in tiles.iter().enumerate() {
        progress.on_progress(Stage::Tiles, k, tiles.len());
        let pixels = slide.read_request(&tile.region)?;
        let path = raw_dir.join(format!("Section_{}_{}.png", tile.x_index + 1, tile.y_index + 1));
        pixels.save(&path).map_err(|e| BatchError::image(&path, e))?;
    }
    progress.on_progress(Stage::Tiles, tiles.len(), tiles.len());
    Ok(())
}

/// Run both phases over every slide of a directory.
///
/// Slides that cannot be opened or mapped are logged and skipped; filesystem
/// errors on the output tree abort the run.
pub fn extract_directory(
    dir: &Path,
    options: &ExtractOptions,
    selector: &mut dyn SelectionProvider,
    progress: &mut dyn Progress,
) -> Result<ExtractSummary, BatchError> {
    let slides = find_slides(dir)?;
    let mut summary = ExtractSummary::default();

    // Phase 1
    let mut plans = Vec::with_capacity(slides.len());
    for (i, path) in slides.iter().enumerate() {
        progress.on_progress(Stage::Selection, i, slides.len());
        let name = slide_stem(path);
        let planned = ImageSlide::open(path)
            .map_err(BatchError::from)
            .and_then(|slide| plan_slide(&slide, &name, options, &mut *selector));
        match planned {
            Ok((thumbnail, boxes)) => {
                info!(slide = %name, level = thumbnail.level, boxes = boxes.len(), "selected");
                plans.push(SlidePlan {
                    path: path.clone(),
                    thumbnail,
                    boxes,
                });
            }
            Err(e) => {
                warn!(slide = %name, error = %e, "skipping slide");
                summary.skipped_slides += 1;
            }
        }
    }
    progress.on_progress(Stage::Selection, slides.len(), slides.len());

    // Phase 2
    let total_sections: usize = plans.iter().map(|p| p.boxes.len()).sum();
    for plan in plans.iter().filter(|p| !p.boxes.is_empty()) {
        progress.on_progress(Stage::Extraction, summary.sections, total_sections);
        let name = slide_stem(&plan.path);
        let slide = match ImageSlide::open(&plan.path) {
            Ok(slide) => slide,
            Err(e) => {
                warn!(slide = %name, error = %e, "skipping slide");
                summary.skipped_slides += 1;
                continue;
            }
        };

        let out_dir = plan.path.with_file_name(&name);
        match extract_slide(&slide, plan.thumbnail, &plan.boxes, &out_dir, options, progress) {
            Ok(tiles) => {
                info!(slide = %name, sections = plan.boxes.len(), tiles, "extracted");
                summary.slides += 1;
                summary.sections += plan.boxes.len();
                summary.tiles += tiles;
            }
            Err(e @ (BatchError::Io { .. } | BatchError::Image { .. })) => return Err(e),
            Err(e) => {
                warn!(slide = %name, error = %e, "skipping slide");
                summary.skipped_slides += 1;
            }
        }
    }
    Ok(summary)
}

fn slide_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "slide".to_string())
}

// =============================================================================
// Tests
// =============================================================================
