//! Image segmentation for histology sections.
//!
//! This module turns section images into masks and measured objects:
//!
//! - [`section`]: separates tissue from the glass background
//! - [`vessels`]: the multi-stage vessel pipeline producing labeled objects
//! - [`stain`]: per-stain strategies selecting the vessel pipeline or a
//!   stained-area rule, plus overlay rendering
//!
//! ```text
//!                    ┌──────────────────┐
//!   RGB section ────►│    Segmenter     │──► StainResult ──► overlay / report
//!                    │  (Stain → rule)  │
//!                    └────────┬─────────┘
//!                             │ BloodVessel
//!                             ▼
//!                      segment_vessels
//! ```

pub mod section;
pub mod stain;
pub mod vessels;

pub use section::SectionDetector;
pub use stain::{Segmenter, Stain, StainResult};
pub use vessels::{segment_vessels, Segmentation};
