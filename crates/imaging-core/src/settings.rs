use clap::Parser;
use std::path::PathBuf;

use crate::calculations::EnrollmentPolicy;
use crate::error::{ImagingError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Medicare cardiac imaging utilization trends report
///
/// Every flag has a default, so running with no arguments processes the
/// standard input layout relative to the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cardiac-imaging",
    about = "Medicare cardiac imaging utilization trends report",
    version
)]
pub struct Settings {
    /// Directory of national by-service files, one per year
    #[arg(long, default_value = "data/national")]
    pub national_dir: PathBuf,

    /// Directory of provider-level by-service files, one per year
    #[arg(long, default_value = "data/provider")]
    pub provider_dir: PathBuf,

    /// Monthly enrollment file
    #[arg(long, default_value = "data/enrollment.csv")]
    pub enrollment_file: PathBuf,

    /// Directory the charts and report are written to
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// First study year; rates are compared against this year
    #[arg(long, default_value = "2013")]
    pub start_year: i32,

    /// Last study year
    #[arg(long, default_value = "2022")]
    pub end_year: i32,

    /// Fail when a year has no national enrollment total instead of
    /// reporting its rates as unavailable
    #[arg(long)]
    pub strict_enrollment: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,
}

impl Settings {
    /// Parse from the process arguments and validate.
    pub fn load() -> Result<Self> {
        Self::parse().validated()
    }

    /// Parse from an explicit argument list and validate.
    pub fn load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
            .map_err(|e| ImagingError::Config(e.to_string()))?
            .validated()
    }

    fn validated(self) -> Result<Self> {
        if self.start_year > self.end_year {
            return Err(ImagingError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        Ok(self)
    }

    /// Baseline year for change-from-baseline ratios.
    pub fn baseline_year(&self) -> i32 {
        self.start_year
    }

    /// Inclusive range of study years.
    pub fn study_years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    pub fn enrollment_policy(&self) -> EnrollmentPolicy {
        if self.strict_enrollment {
            EnrollmentPolicy::Strict
        } else {
            EnrollmentPolicy::Propagate
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
