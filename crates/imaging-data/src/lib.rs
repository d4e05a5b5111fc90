//! Data ingestion and aggregation for the cardiac imaging report.
//!
//! Discovers per-year CMS files, streams them into typed records, restricts
//! them to imaging codes, groups them by year and modality, and runs the
//! top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod enrollment;
pub mod reader;

pub use imaging_core as core;
