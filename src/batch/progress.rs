//! Progress reporting for the batch drivers.
//!
//! Drivers call [`Progress::on_progress`] synchronously between units of
//! work. The callback never influences the pipeline; it only observes it.

use std::fmt;

use tracing::info;

/// Phase of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Choosing boxes on slide thumbnails
    Selection,
    /// Extracting sections across the run
    Extraction,
    /// Reading the full-resolution tiles of one section
    Tiles,
    /// Segmenting section images
    Processing,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Selection => "selection",
            Stage::Extraction => "extraction",
            Stage::Tiles => "tiles",
            Stage::Processing => "processing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of progress notifications.
///
/// `current` counts completed units, starting at 0 before the first one.
pub trait Progress {
    fn on_progress(&mut self, stage: Stage, current: usize, total: usize);
}

impl<F> Progress for F
where
    F: FnMut(Stage, usize, usize),
{
    fn on_progress(&mut self, stage: Stage, current: usize, total: usize) {
        self(stage, current, total)
    }
}

/// Ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_progress(&mut self, _stage: Stage, _current: usize, _total: usize) {}
}

/// Logs each notification at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn on_progress(&mut self, stage: Stage, current: usize, total: usize) {
        info!(stage = %stage, "{}/{}", current, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_progress() {
        let mut seen = Vec::new();
        {
            let mut progress = |stage: Stage, current: usize, total: usize| seen.push((stage, current, total));
            progress.on_progress(Stage::Processing, 1, 3);
            progress.on_progress(Stage::Processing, 2, 3);
        }
        assert_eq!(seen, vec![(Stage::Processing, 1, 3), (Stage::Processing, 2, 3)]);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Extraction.to_string(), "extraction");
        assert_eq!(Stage::Tiles.to_string(), "tiles");
        NoProgress.on_progress(Stage::Selection, 0, 0);
    }
}
