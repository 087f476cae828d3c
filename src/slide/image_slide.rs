//! Slides backed by a single raster file.
//!
//! The file is decoded once as the level-0 image. Coarser levels are built
//! on demand by repeated 2x2 box averaging and kept in an LRU cache, so a
//! thumbnail followed by many tile reads only pays for each level once.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use image::{imageops, ImageError, Rgba, RgbaImage};
use lru::LruCache;
use tracing::debug;

use crate::error::SlideError;

use super::geometry::{RegionRequest, MAX_PYRAMID_LEVELS};
use super::source::SlideSource;

/// Default number of downsampled levels kept in memory.
pub const DEFAULT_LEVEL_CACHE_CAPACITY: usize = 4;

/// A slide decoded from an image file, with synthesized pyramid levels.
pub struct ImageSlide {
    base: Arc<RgbaImage>,
    levels: Mutex<LruCache<u32, Arc<RgbaImage>>>,
}

impl ImageSlide {
    /// Decode a slide from any format the `image` crate reads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SlideError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) => SlideError::Io(format!("{}: {}", path.display(), io)),
            other => SlideError::Decode {
                message: format!("{}: {}", path.display(), other),
            },
        })?;
        debug!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "opened slide"
        );
        Ok(Self::from_image(decoded.to_rgba8()))
    }

    /// Wrap an in-memory level-0 image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self::with_cache_capacity(image, DEFAULT_LEVEL_CACHE_CAPACITY)
    }

    /// Wrap an image, keeping at most `capacity` downsampled levels.
    pub fn with_cache_capacity(image: RgbaImage, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            base: Arc::new(image),
            levels: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of downsampled levels currently cached.
    pub fn cached_levels(&self) -> usize {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Pixels of a whole level, building it from the next finer one if needed.
    fn level_image(&self, level: u32) -> Result<Arc<RgbaImage>, SlideError> {
        if level >= MAX_PYRAMID_LEVELS {
            return Err(SlideError::InvalidLevel {
                level,
                max_levels: MAX_PYRAMID_LEVELS,
            });
        }
        if level == 0 {
            return Ok(Arc::clone(&self.base));
        }

        let cached = self
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&level)
            .cloned();
        if let Some(image) = cached {
            return Ok(image);
        }

        let finer = self.level_image(level - 1)?;
        let image = Arc::new(downsample(&finer));
        debug!(level, width = image.width(), height = image.height(), "built level");
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(level, Arc::clone(&image));
        Ok(image)
    }
}

impl SlideSource for ImageSlide {
    fn dimensions(&self) -> (u32, u32) {
        self.base.dimensions()
    }

    fn read_region(&self, origin: (u64, u64), level: u32, size: (u32, u32)) -> Result<RgbaImage, SlideError> {
        let request = RegionRequest { origin, level, size };
        self.geometry().check_region(&request)?;

        let image = self.level_image(level)?;
        // Bounds checked above, so the level coordinates fit in u32
        let x = (origin.0 >> level) as u32;
        let y = (origin.1 >> level) as u32;
        Ok(imageops::crop_imm(image.as_ref(), x, y, size.0, size.1).to_image())
    }
}

/// Halve an image by averaging 2x2 blocks; odd trailing rows and columns are dropped.
fn downsample(image: &RgbaImage) -> RgbaImage {
    let (width, height) = (image.width() / 2, image.height() / 2);
    RgbaImage::from_fn(width, height, |x, y| {
        let mut sum = [0u32; 4];
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let Rgba(px) = image.get_pixel(2 * x + dx, 2 * y + dy);
            for (acc, &v) in sum.iter_mut().zip(px) {
                *acc += v as u32;
            }
        }
        Rgba(sum.map(|s| ((s + 2) / 4) as u8))
    })
}

// =============================================================================
// Tests
// =============================================================================
