//! Integration tests for WSI Vessels.
//!
//! These tests verify end-to-end functionality including:
//! - Vessel segmentation on synthetic rings and disks
//! - Section detection and label compaction properties
//! - Multi-resolution coordinate mapping against an image-backed slide
//! - Extraction and processing drivers on a temporary directory tree

mod integration {
    pub mod test_utils;

    pub mod batch_tests;
    pub mod geometry_tests;
    pub mod pipeline_tests;
}
