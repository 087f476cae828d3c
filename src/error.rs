use thiserror::Error;

/// Errors raised by the pixel-level segmentation pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    /// Percentile normalization over a channel with no dynamic range
    #[error("Degenerate intensity range: lower bound {lower} equals upper bound {upper}")]
    DegenerateRange { lower: f64, upper: f64 },

    /// Two buffers that must share a shape do not
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A numeric parameter outside its valid domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors produced when mapping boxes and tiles between pyramid levels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// No pyramid level brings the requested extent under the cap
    #[error("No pyramid level fits: extent {extent} never drops under {max_dim} within {levels} levels")]
    NoLevelFits { extent: u64, max_dim: u32, levels: u32 },

    /// A region request falls (partly) outside the slide
    #[error(
        "Region out of bounds: origin ({x}, {y}) size {width}x{height} at level {level} \
         exceeds slide dimensions {slide_width}x{slide_height}"
    )]
    OutOfBounds {
        x: u64,
        y: u64,
        width: u64,
        height: u64,
        level: u32,
        slide_width: u64,
        slide_height: u64,
    },

    /// Tile grid parameters are unusable
    #[error("Invalid tile grid: index ({x_index}, {y_index}) in a {n_slices}x{n_slices} grid")]
    InvalidGrid {
        n_slices: u32,
        x_index: u32,
        y_index: u32,
    },

    /// A selection box with zero width or height
    #[error("Empty selection box: ({min_x}, {min_y}) to ({max_x}, {max_y})")]
    EmptyBox {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
    },
}

/// Errors that can occur when opening or reading a slide
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// Filesystem error while opening the slide
    #[error("I/O error: {0}")]
    Io(String),

    /// The slide file could not be decoded
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Requested level does not exist
    #[error("Invalid level {level}: slide exposes levels 0..{max_levels}")]
    InvalidLevel { level: u32, max_levels: u32 },

    /// Region request outside the slide geometry
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Errors surfaced by the batch drivers (extraction and processing)
#[derive(Debug, Error)]
pub enum BatchError {
    /// Filesystem error on the working directory
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Slide access error
    #[error("Slide error: {0}")]
    Slide(#[from] SlideError),

    /// Geometry error while planning tiles
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Segmentation error on a single image
    #[error("Segmentation error: {0}")]
    Segment(#[from] SegmentError),

    /// Image could not be read or written
    #[error("Image error on {path}: {message}")]
    Image { path: String, message: String },

    /// The selection provider failed or was cancelled
    #[error("Selection error: {0}")]
    Selection(String),

    /// The report could not be serialized or written
    #[error("Report error: {0}")]
    Report(String),
}

impl BatchError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        BatchError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn image(path: &std::path::Path, err: image::ImageError) -> Self {
        BatchError::Image {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
