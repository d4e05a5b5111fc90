//! Report rendering for the cardiac imaging utilization analysis.
//!
//! Turns an [`imaging_data::analysis::AnalysisResult`] into SVG charts and a
//! Markdown report.

pub mod chart;
pub mod document;
pub mod table_view;

pub use document::{ReportFiles, ReportWriter};
