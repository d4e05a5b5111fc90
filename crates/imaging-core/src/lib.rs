//! Core types and calculations for the cardiac imaging utilization report.
//!
//! Holds the data model, the error type, the modality code sets, the
//! specialty rules, the rate/ratio calculator and CLI settings. Nothing in
//! this crate touches the filesystem.

pub mod calculations;
pub mod codes;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod specialty;
