mod bootstrap;

use anyhow::{Context, Result};
use imaging_core::codes::CodeSets;
use imaging_core::settings::Settings;
use imaging_core::specialty::SpecialtyRules;
use imaging_data::analysis::{analyze, AnalysisConfig};
use imaging_report::ReportWriter;

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Cardiac imaging report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Years {}-{} (baseline {}), output {}",
        settings.start_year,
        settings.end_year,
        settings.baseline_year(),
        settings.output_dir.display()
    );

    let codes = CodeSets::cardiac_imaging().context("building modality code sets")?;
    let rules = SpecialtyRules::cardiac_imaging().context("building specialty rules")?;

    let config = AnalysisConfig::from(&settings);
    let result = analyze(&config, &codes, &rules).context("analysis failed")?;
    tracing::info!(
        "Analysed {} national and {} provider imaging rows in {:.2}s",
        result.metadata.national_records,
        result.metadata.provider_records,
        result.metadata.load_time_seconds
    );

    let files = ReportWriter::new(&settings.output_dir)
        .write(&result)
        .with_context(|| format!("writing report to {}", settings.output_dir.display()))?;

    tracing::info!("Report: {}", files.report.display());
    Ok(())
}
