//! WSI Vessels - Section extraction and vessel segmentation for Whole Slide Images.
//!
//! This binary parses the command line, configures logging and runs one of
//! the batch drivers.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_vessels::{
    batch::{extract_directory, process_tree, JsonReportWriter, LogProgress},
    config::{Cli, Command, ExtractConfig, ProcessConfig},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Extract(config) => run_extract(config),
        Command::Process(config) => run_process(config),
    }
}

// =============================================================================
// Extract Command
// =============================================================================

fn run_extract(config: ExtractConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Directory: {}", config.dir.display());
    info!("  Thumbnail cap: {} px", config.thumbnail_max);
    info!("  Tiles: {0}x{0} per section", config.tiles);
    if config.boxes.is_empty() {
        info!("  Selection: automatic, up to {} section(s)", config.sections);
    } else {
        info!("  Selection: {} manual box(es)", config.boxes.len());
    }

    let mut selector = config.selector();
    match extract_directory(&config.dir, &config.options(), selector.as_mut(), &mut LogProgress) {
        Ok(summary) => {
            info!(
                "Extracted {} tile(s) from {} section(s) of {} slide(s)",
                summary.tiles, summary.sections, summary.slides
            );
            if summary.skipped_slides > 0 {
                warn!("Skipped {} slide(s)", summary.skipped_slides);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Extraction failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Process Command
// =============================================================================

fn run_process(config: ProcessConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = config.options();
    info!("Configuration:");
    info!("  Directory: {}", config.dir.display());
    info!("  Stain: {}", options.stain);
    info!("  Section detector: {}", options.detector.name());
    info!("  Pixel size: {} um", options.um_per_pixel);

    match process_tree(&config.dir, &options, &JsonReportWriter, &mut LogProgress) {
        Ok(summary) => {
            info!(
                "Processed {} image(s) in {} section(s)",
                summary.images, summary.sections
            );
            if summary.skipped_images > 0 {
                warn!("Skipped {} image(s)", summary.skipped_images);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Processing failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_vessels=debug"
    } else {
        "wsi_vessels=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
