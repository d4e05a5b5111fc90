use std::path::PathBuf;
use thiserror::Error;

use crate::models::{Modality, Series};

/// All errors produced by the imaging pipeline.
#[derive(Error, Debug)]
pub enum ImagingError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column header is absent from an input file.
    #[error("Missing column {column} in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// A filename contained no run of digits to read a year from.
    #[error("No year found in file name: {0}")]
    MissingYear(PathBuf),

    /// A count field could not be coerced to a non-negative integer.
    #[error("Invalid number {value:?} in column {column} at {path}:{line}")]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    /// The expected input directory or file does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No input files were found under the given directory.
    #[error("No data files found in {0}")]
    NoDataFiles(PathBuf),

    /// A procedure code was listed under two modalities.
    #[error("Code {code} is listed under both {first} and {second}")]
    OverlappingCodeSets {
        code: String,
        first: Modality,
        second: Modality,
    },

    /// No annual national enrollment total exists for a year that has volume.
    #[error("No national enrollment total for year {0}")]
    MissingEnrollment(i32),

    /// A series has no volume in the baseline year, so no ratio can be formed.
    #[error("{series} has no volume in baseline year {year}")]
    MissingBaseline { series: Series, year: i32 },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the imaging crates.
pub type Result<T> = std::result::Result<T, ImagingError>;
