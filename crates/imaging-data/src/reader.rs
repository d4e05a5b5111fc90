//! Per-year CSV discovery and loading.
//!
//! Reads the CMS national and provider-level by-service summary files. Each
//! file covers one year; discovery reads that year from the first run of
//! digits in the file name and hands the loaders an explicit [`YearFile`]
//! list, so callers can also supply years directly.

use std::fs::File;
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use csv::StringRecord;
use imaging_core::error::{ImagingError, Result};
use imaging_core::models::{ProviderServiceRecord, ServiceRecord};
use regex::Regex;
use tracing::{debug, warn};

// ── Column layouts ────────────────────────────────────────────────────────────

/// Source headers of the national by-geography-and-service file.
#[derive(Debug, Clone)]
pub struct NationalColumns {
    /// Geography level; when present only `National` rows are kept.
    pub geo_level: Option<&'static str>,
    pub code: &'static str,
    pub n_services: &'static str,
}

impl Default for NationalColumns {
    fn default() -> Self {
        Self {
            geo_level: Some("Rndrng_Prvdr_Geo_Lvl"),
            code: "HCPCS_Cd",
            n_services: "Tot_Srvcs",
        }
    }
}

/// Source headers of the provider-and-service file.
#[derive(Debug, Clone)]
pub struct ProviderColumns {
    pub npi: &'static str,
    pub provider_type: &'static str,
    pub credentials: &'static str,
    pub gender: &'static str,
    pub code: &'static str,
    pub n_services: &'static str,
}

impl Default for ProviderColumns {
    fn default() -> Self {
        Self {
            npi: "Rndrng_NPI",
            provider_type: "Rndrng_Prvdr_Type",
            credentials: "Rndrng_Prvdr_Crdntls",
            gender: "Rndrng_Prvdr_Gndr",
            code: "HCPCS_Cd",
            n_services: "Tot_Srvcs",
        }
    }
}

/// A data file and the year it covers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearFile {
    pub year: i32,
    pub path: PathBuf,
}

// ── Discovery ─────────────────────────────────────────────────────────────────

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("regex is valid"))
}

/// Read a year from the first run of decimal digits in a file name.
pub fn year_from_file_name(path: &Path) -> Result<i32> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .ok_or_else(|| ImagingError::MissingYear(path.to_path_buf()))?;

    digit_run()
        .find(&name)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .ok_or_else(|| ImagingError::MissingYear(path.to_path_buf()))
}

/// List the regular files directly inside `dir`, sorted by path.
pub fn find_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(ImagingError::DataPathNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ImagingError::Io(e.into()))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ImagingError::NoDataFiles(dir.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Find the per-year files in `dir` and attach each file's year.
///
/// Files whose year falls outside `years` are skipped with a warning. A file
/// name without digits aborts discovery. Results are sorted by year, then
/// path.
pub fn discover_year_files(dir: &Path, years: &RangeInclusive<i32>) -> Result<Vec<YearFile>> {
    let mut found = Vec::new();
    for path in find_data_files(dir)? {
        let year = year_from_file_name(&path)?;
        if !years.contains(&year) {
            warn!(
                "Skipping {}: year {} is outside {}-{}",
                path.display(),
                year,
                years.start(),
                years.end()
            );
            continue;
        }
        found.push(YearFile { year, path });
    }

    if found.is_empty() {
        return Err(ImagingError::NoDataFiles(dir.to_path_buf()));
    }
    found.sort();
    debug!("Discovered {} year files in {}", found.len(), dir.display());
    Ok(found)
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load national records from `files`, keeping rows whose code passes
/// `keep_code`.
pub fn load_national_records(
    files: &[YearFile],
    columns: &NationalColumns,
    keep_code: &dyn Fn(&str) -> bool,
) -> Result<Vec<ServiceRecord>> {
    let mut records = Vec::new();

    for file in files {
        let before = records.len();
        let mut skipped_geo = 0u64;
        let sink = &mut records;
        let skipped = &mut skipped_geo;

        read_csv(&file.path, |headers| {
            let code = column_index(&file.path, headers, columns.code)?;
            let n_services = column_index(&file.path, headers, columns.n_services)?;
            let geo_level = columns.geo_level.and_then(|name| find_column(headers, name));

            Ok(move |row: &StringRecord, line: u64| -> Result<()> {
                if let Some(idx) = geo_level {
                    if !field(row, idx).eq_ignore_ascii_case("National") {
                        *skipped += 1;
                        return Ok(());
                    }
                }
                let raw_code = field(row, code);
                if !keep_code(raw_code) {
                    return Ok(());
                }
                let count =
                    parse_count_field(&file.path, line, columns.n_services, row, n_services)?;
                sink.push(ServiceRecord {
                    year: file.year,
                    code: raw_code.to_string(),
                    n_services: count,
                });
                Ok(())
            })
        })?;

        debug!(
            "File {} ({}): {} rows kept, {} sub-national rows skipped",
            file.path.display(),
            file.year,
            records.len() - before,
            skipped_geo
        );
    }

    Ok(records)
}

/// Load provider-level records from `files`, keeping rows whose code passes
/// `keep_code`.
pub fn load_provider_records(
    files: &[YearFile],
    columns: &ProviderColumns,
    keep_code: &dyn Fn(&str) -> bool,
) -> Result<Vec<ProviderServiceRecord>> {
    let mut records = Vec::new();

    for file in files {
        let before = records.len();
        let sink = &mut records;

        read_csv(&file.path, |headers| {
            let npi = column_index(&file.path, headers, columns.npi)?;
            let provider_type = column_index(&file.path, headers, columns.provider_type)?;
            let credentials = column_index(&file.path, headers, columns.credentials)?;
            let gender = column_index(&file.path, headers, columns.gender)?;
            let code = column_index(&file.path, headers, columns.code)?;
            let n_services = column_index(&file.path, headers, columns.n_services)?;

            Ok(move |row: &StringRecord, line: u64| -> Result<()> {
                let raw_code = field(row, code);
                if !keep_code(raw_code) {
                    return Ok(());
                }
                let count =
                    parse_count_field(&file.path, line, columns.n_services, row, n_services)?;
                sink.push(ProviderServiceRecord {
                    year: file.year,
                    npi: field(row, npi).to_string(),
                    provider_type: field(row, provider_type).to_string(),
                    credentials: field(row, credentials).to_string(),
                    gender: field(row, gender).to_string(),
                    code: raw_code.to_string(),
                    n_services: count,
                });
                Ok(())
            })
        })?;

        debug!(
            "File {} ({}): {} rows kept",
            file.path.display(),
            file.year,
            records.len() - before
        );
    }

    Ok(records)
}

// ── Shared CSV helpers ────────────────────────────────────────────────────────

/// Stream a headed CSV file.
///
/// `setup` receives the header row and returns the per-row handler, which is
/// called with each record and its 1-based line number.
pub(crate) fn read_csv<S, F>(path: &Path, setup: S) -> Result<()>
where
    S: FnOnce(&StringRecord) -> Result<F>,
    F: FnMut(&StringRecord, u64) -> Result<()>,
{
    let file = File::open(path).map_err(|source| ImagingError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let csv_err = |source: csv::Error| ImagingError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    let mut handle = setup(&headers)?;

    let mut row = StringRecord::new();
    while reader.read_record(&mut row).map_err(csv_err)? {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        handle(&row, line)?;
    }
    Ok(())
}

/// Position of a header; a UTF-8 BOM on the first header is ignored.
pub(crate) fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
}

/// Position of a required header.
pub(crate) fn column_index(path: &Path, headers: &StringRecord, name: &str) -> Result<usize> {
    find_column(headers, name).ok_or_else(|| ImagingError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
}

pub(crate) fn field(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("").trim()
}

/// Coerce a count to a non-negative integer.
///
/// Accepts thousands separators and decimals (rounded to the nearest
/// integer). Returns `None` for anything else, including negatives.
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }
    let value = cleaned.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

fn parse_count_field(
    path: &Path,
    line: u64,
    column: &str,
    row: &StringRecord,
    idx: usize,
) -> Result<u64> {
    let raw = field(row, idx);
    parse_count(raw).ok_or_else(|| ImagingError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
