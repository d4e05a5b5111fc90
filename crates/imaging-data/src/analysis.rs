//! End-to-end analysis pipeline.
//!
//! Discovers and loads the national, provider and enrollment inputs, then
//! classifies, aggregates and computes rates, returning an
//! [`AnalysisResult`] ready for the report layer.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use imaging_core::calculations::{EnrollmentPolicy, RateCalculator};
use imaging_core::codes::CodeSets;
use imaging_core::error::Result;
use imaging_core::models::{
    EnrollmentRecord, ImagingService, ProviderImagingService, ReaderCount, SpecialtyMix,
    UtilizationRow,
};
use imaging_core::settings::Settings;
use imaging_core::specialty::SpecialtyRules;
use tracing::info;

use crate::aggregator::{volume_by_year_modality, NationalAggregator, ProviderAggregator};
use crate::enrollment::{load_enrollment, EnrollmentColumns};
use crate::reader::{
    discover_year_files, load_national_records, load_provider_records, NationalColumns,
    ProviderColumns,
};

// ── Public types ──────────────────────────────────────────────────────────────

/// Inputs and options for one pipeline run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub national_dir: PathBuf,
    pub provider_dir: PathBuf,
    pub enrollment_file: PathBuf,
    pub years: RangeInclusive<i32>,
    pub baseline_year: i32,
    pub policy: EnrollmentPolicy,
}

impl From<&Settings> for AnalysisConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            national_dir: settings.national_dir.clone(),
            provider_dir: settings.provider_dir.clone(),
            enrollment_file: settings.enrollment_file.clone(),
            years: settings.study_years(),
            baseline_year: settings.baseline_year(),
            policy: settings.enrollment_policy(),
        }
    }
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    pub first_year: i32,
    pub last_year: i32,
    pub baseline_year: i32,
    pub national_files: usize,
    pub provider_files: usize,
    /// National rows with an imaging code.
    pub national_records: usize,
    /// Provider rows with an imaging code.
    pub provider_records: usize,
    /// Wall-clock seconds spent reading input files.
    pub load_time_seconds: f64,
}

/// The complete output of [`analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Per-modality utilization, ordered by modality then year.
    pub by_modality: Vec<UtilizationRow>,
    /// All modalities pooled, one row per year.
    pub total: Vec<UtilizationRow>,
    /// Distinct providers per modality and year, with per-year totals.
    pub readers: Vec<ReaderCount>,
    pub specialty_mix: Vec<SpecialtyMix>,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline.
///
/// 1. Discover per-year national and provider files within the study window.
/// 2. Load them, keeping only rows with an imaging code.
/// 3. Load annual national enrollment.
/// 4. Aggregate and compute rates via [`summarize`].
pub fn analyze(
    config: &AnalysisConfig,
    codes: &CodeSets,
    rules: &SpecialtyRules,
) -> Result<AnalysisResult> {
    let keep_code = |code: &str| codes.contains(code);

    // ── Step 1: Discover ──────────────────────────────────────────────────────
    let national_files = discover_year_files(&config.national_dir, &config.years)?;
    let provider_files = discover_year_files(&config.provider_dir, &config.years)?;

    // ── Step 2: Load claims ───────────────────────────────────────────────────
    let load_start = Instant::now();
    let national_records =
        load_national_records(&national_files, &NationalColumns::default(), &keep_code)?;
    let provider_records =
        load_provider_records(&provider_files, &ProviderColumns::default(), &keep_code)?;
    info!(
        "Loaded {} national and {} provider imaging rows from {} + {} files",
        national_records.len(),
        provider_records.len(),
        national_files.len(),
        provider_files.len()
    );

    // ── Step 3: Load enrollment ───────────────────────────────────────────────
    let enrollment = load_enrollment(&config.enrollment_file, &EnrollmentColumns::default())?;
    let load_time = load_start.elapsed().as_secs_f64();
    info!("Loaded enrollment totals for {} years", enrollment.len());

    // ── Step 4: Aggregate ─────────────────────────────────────────────────────
    let national = NationalAggregator::new(codes).classify(national_records);
    let provider = ProviderAggregator::new(codes, rules).classify(provider_records);

    let mut result = summarize(&national, &provider, &enrollment, config)?;
    result.metadata.national_files = national_files.len();
    result.metadata.provider_files = provider_files.len();
    result.metadata.load_time_seconds = load_time;
    Ok(result)
}

/// Aggregate classified services and compute utilization figures.
///
/// Pure with respect to its inputs; file counts and timing in the returned
/// metadata are left at zero.
pub fn summarize(
    national: &[ImagingService],
    provider: &[ProviderImagingService],
    enrollment: &[EnrollmentRecord],
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    let cells = volume_by_year_modality(national);
    let by_modality =
        RateCalculator::utilization(&cells, enrollment, config.baseline_year, config.policy)?;
    let total = RateCalculator::utilization(
        &RateCalculator::pooled_total(&cells),
        enrollment,
        config.baseline_year,
        config.policy,
    )?;

    let readers = ProviderAggregator::reader_counts(provider);
    let specialty_mix = ProviderAggregator::specialty_mix(provider);
    info!(
        "Computed {} modality-year rows, {} reader counts, {} specialty-mix rows",
        by_modality.len(),
        readers.len(),
        specialty_mix.len()
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        first_year: *config.years.start(),
        last_year: *config.years.end(),
        baseline_year: config.baseline_year,
        national_files: 0,
        provider_files: 0,
        national_records: national.len(),
        provider_records: provider.len(),
        load_time_seconds: 0.0,
    };

    Ok(AnalysisResult {
        by_modality,
        total,
        readers,
        specialty_mix,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
