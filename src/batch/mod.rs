//! Batch drivers.
//!
//! The drivers own all I/O around the pure segmentation core:
//!
//! - [`extract`]: slides → thumbnails → selected boxes → tile grids on disk
//! - [`process`]: tiles on disk → segmentation → overlays and reports
//! - [`selection`]: how boxes are chosen (fixed or automatic)
//! - [`progress`]: synchronous progress notifications
//! - [`report`]: per-section measurement reports
//!
//! Errors are handled per unit of work: an unreadable slide or image is
//! logged and skipped, while failures to write the output tree abort the run.

pub mod extract;
pub mod process;
pub mod progress;
pub mod report;
pub mod selection;

pub use extract::{extract_directory, ExtractOptions, ExtractSummary};
pub use process::{process_tree, ProcessOptions, ProcessSummary};
pub use progress::{LogProgress, NoProgress, Progress, Stage};
pub use report::{JsonReportWriter, ReportWriter, SectionMeasurements, SectionReport, VesselRecord};
pub use selection::{AutoSectionSelector, FixedSelection, SelectionProvider};
