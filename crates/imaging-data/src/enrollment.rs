//! Medicare monthly enrollment loading.
//!
//! The enrollment file mixes national, state and county rows, each reported
//! per month plus an annual `Year` row. Only the annual national rows are
//! kept, giving one Part B beneficiary count per year.

use std::collections::BTreeMap;
use std::path::Path;

use csv::StringRecord;
use imaging_core::error::{ImagingError, Result};
use imaging_core::models::EnrollmentRecord;
use tracing::{debug, warn};

use crate::reader::{column_index, field, parse_count, read_csv};

/// Geography level of the rows that are kept.
pub const NATIONAL_LEVEL: &str = "National";
/// Month label of annual-total rows.
pub const ANNUAL_MONTH: &str = "Year";

/// Source headers of the monthly enrollment file.
#[derive(Debug, Clone)]
pub struct EnrollmentColumns {
    pub geo_level: &'static str,
    pub month: &'static str,
    pub year: &'static str,
    pub n_part_b: &'static str,
}

impl Default for EnrollmentColumns {
    fn default() -> Self {
        Self {
            geo_level: "BENE_GEO_LVL",
            month: "MONTH",
            year: "YEAR",
            n_part_b: "B_TOT_BENES",
        }
    }
}

/// Load annual national Part B totals, one record per year, sorted by year.
///
/// A beneficiary count that is not numeric (CMS suppresses some cells with
/// `*`) is kept as `None`. When a year has more than one annual national row
/// the last one wins.
pub fn load_enrollment(path: &Path, columns: &EnrollmentColumns) -> Result<Vec<EnrollmentRecord>> {
    if !path.exists() {
        return Err(ImagingError::DataPathNotFound(path.to_path_buf()));
    }

    let mut by_year: BTreeMap<i32, Option<u64>> = BTreeMap::new();
    let sink = &mut by_year;
    let mut rows_read = 0u64;
    let counter = &mut rows_read;

    read_csv(path, |headers| {
        let geo_level = column_index(path, headers, columns.geo_level)?;
        let month = column_index(path, headers, columns.month)?;
        let year_col = column_index(path, headers, columns.year)?;
        let n_part_b = column_index(path, headers, columns.n_part_b)?;

        Ok(move |row: &StringRecord, line: u64| -> Result<()> {
            *counter += 1;
            if !field(row, geo_level).eq_ignore_ascii_case(NATIONAL_LEVEL)
                || !field(row, month).eq_ignore_ascii_case(ANNUAL_MONTH)
            {
                return Ok(());
            }

            let raw_year = field(row, year_col);
            let year: i32 = raw_year.parse().map_err(|_| ImagingError::InvalidNumber {
                path: path.to_path_buf(),
                line,
                column: columns.year.to_string(),
                value: raw_year.to_string(),
            })?;

            let count = parse_count(field(row, n_part_b));
            if count.is_none() {
                warn!("Enrollment count for {} is not numeric", year);
            }
            if sink.insert(year, count).is_some() {
                warn!("Duplicate national enrollment total for {}; using the last one", year);
            }
            Ok(())
        })
    })?;

    debug!(
        "Enrollment {}: {} rows read, {} annual national totals",
        path.display(),
        rows_read,
        by_year.len()
    );

    Ok(by_year
        .into_iter()
        .map(|(year, n_part_b)| EnrollmentRecord { year, n_part_b })
        .collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
