//! Report assembly: charts, tables and narrative written to the output
//! directory.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use imaging_core::calculations::checked_ratio;
use imaging_core::error::{ImagingError, Result};
use imaging_core::formatting::{format_count, format_number};
use imaging_core::models::{Modality, Series, UtilizationRow};
use imaging_data::analysis::AnalysisResult;
use tracing::info;

use crate::chart::{LineChart, YScale};
use crate::table_view::{specialty_mix_table, volume_rate_table};

pub const VOLUME_CHART: &str = "volume.svg";
pub const RATIO_CHART: &str = "ratio.svg";
pub const READERS_CHART: &str = "readers.svg";
pub const REPORT: &str = "report.md";

/// Paths of the files written by [`ReportWriter::write`].
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub volume_chart: PathBuf,
    pub ratio_chart: PathBuf,
    pub readers_chart: PathBuf,
    pub report: PathBuf,
}

/// Writes the report for one analysis run into a directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render every chart and the Markdown report, creating the output
    /// directory if needed. Existing files are overwritten.
    pub fn write(&self, result: &AnalysisResult) -> Result<ReportFiles> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ImagingError::FileWrite {
            path: self.output_dir.clone(),
            source,
        })?;

        let files = ReportFiles {
            volume_chart: self.output_dir.join(VOLUME_CHART),
            ratio_chart: self.output_dir.join(RATIO_CHART),
            readers_chart: self.output_dir.join(READERS_CHART),
            report: self.output_dir.join(REPORT),
        };

        write_file(&files.volume_chart, &volume_chart(result).render_svg())?;
        write_file(&files.ratio_chart, &ratio_chart(result).render_svg())?;
        write_file(&files.readers_chart, &readers_chart(result).render_svg())?;
        write_file(&files.report, &render_markdown(result))?;

        info!("Report written to {}", self.output_dir.display());
        Ok(files)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| ImagingError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

// ── Charts ────────────────────────────────────────────────────────────────────

/// Services per year, one line per modality, log scale.
pub fn volume_chart(result: &AnalysisResult) -> LineChart {
    Modality::ALL.iter().fold(
        LineChart::new("Cardiac imaging volume", "Services", YScale::Log10),
        |chart, modality| {
            let points = series_points(&result.by_modality, Series::Modality(*modality), |r| {
                Some(r.n as f64)
            });
            if points.is_empty() {
                chart
            } else {
                chart.with_series(modality.label(), points)
            }
        },
    )
}

/// Change in per-beneficiary rate relative to the baseline year, with a
/// reference line at 1.
pub fn ratio_chart(result: &AnalysisResult) -> LineChart {
    let title = format!(
        "Rate per beneficiary relative to {}",
        result.metadata.baseline_year
    );
    Modality::ALL
        .iter()
        .fold(
            LineChart::new(title, "Ratio", YScale::Linear),
            |chart, modality| {
                let points =
                    series_points(&result.by_modality, Series::Modality(*modality), |r| r.ratio);
                if points.is_empty() {
                    chart
                } else {
                    chart.with_series(modality.label(), points)
                }
            },
        )
        .with_reference_line(1.0)
}

/// Distinct billing providers per year, one line per modality, log scale.
pub fn readers_chart(result: &AnalysisResult) -> LineChart {
    Modality::ALL.iter().fold(
        LineChart::new("Providers billing cardiac imaging", "Providers", YScale::Log10),
        |chart, modality| {
            let points: Vec<(i32, Option<f64>)> = result
                .readers
                .iter()
                .filter(|r| r.series == Series::Modality(*modality))
                .map(|r| (r.year, Some(r.n_readers as f64)))
                .collect();
            if points.is_empty() {
                chart
            } else {
                chart.with_series(modality.label(), points)
            }
        },
    )
}

fn series_points(
    rows: &[UtilizationRow],
    series: Series,
    value: impl Fn(&UtilizationRow) -> Option<f64>,
) -> Vec<(i32, Option<f64>)> {
    rows.iter()
        .filter(|r| r.series == series)
        .map(|r| (r.year, value(r)))
        .collect()
}

// ── Markdown ──────────────────────────────────────────────────────────────────

/// First and last years with volume, falling back to the configured window.
fn year_span(result: &AnalysisResult) -> (i32, i32) {
    let years = result.total.iter().map(|r| r.year);
    match (years.clone().min(), years.max()) {
        (Some(first), Some(last)) => (first, last),
        _ => (result.metadata.first_year, result.metadata.last_year),
    }
}

/// Plain-language summary sentences.
pub fn narrative(result: &AnalysisResult) -> Vec<String> {
    let (first, last) = year_span(result);
    let baseline = result.metadata.baseline_year;
    let mut sentences = Vec::new();

    let total_at = |year: i32| result.total.iter().find(|r| r.year == year);
    if let (Some(start), Some(end)) = (total_at(first), total_at(last)) {
        let change = checked_ratio(end.n as f64 - start.n as f64, start.n as f64)
            .map(|c| {
                let pct = format_number(c * 100.0, 1);
                if c > 0.0 {
                    format!("+{}%", pct)
                } else {
                    format!("{}%", pct)
                }
            })
            .unwrap_or_else(|| "change not available".to_string());
        sentences.push(format!(
            "Total cardiac imaging volume went from {} services in {} to {} in {} ({}).",
            format_count(start.n),
            first,
            format_count(end.n),
            last,
            change
        ));
    }

    for modality in Modality::ALL {
        let row = result
            .by_modality
            .iter()
            .find(|r| r.series == Series::Modality(modality) && r.year == last);
        let Some(row) = row else { continue };
        match row.ratio {
            Some(ratio) => sentences.push(format!(
                "In {}, the {} rate per Part B beneficiary was {} times its {} level.",
                last,
                modality.label(),
                format_number(ratio, 2),
                baseline
            )),
            None => sentences.push(format!(
                "In {}, the {} rate relative to {} is not available.",
                last,
                modality.label(),
                baseline
            )),
        }
    }

    sentences
}

/// The full Markdown report, referencing the chart files by name.
pub fn render_markdown(result: &AnalysisResult) -> String {
    let (first, last) = year_span(result);
    let generated = DateTime::parse_from_rfc3339(&result.metadata.generated_at)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| result.metadata.generated_at.clone());

    let mut out = String::new();
    out.push_str("# Medicare cardiac imaging utilization\n\n");
    out.push_str(&format!(
        "Study years {}–{}, baseline {}. Generated {}.\n\n",
        result.metadata.first_year, result.metadata.last_year, result.metadata.baseline_year, generated
    ));

    out.push_str("## Summary\n\n");
    for sentence in narrative(result) {
        out.push_str(&format!("- {}\n", sentence));
    }
    out.push('\n');

    out.push_str("## Volume\n\n");
    out.push_str(&format!("![Volume by modality]({})\n\n", VOLUME_CHART));
    let mut rows = result.by_modality.clone();
    rows.extend(result.total.iter().copied());
    out.push_str(&volume_rate_table(&rows, first, last));
    out.push('\n');

    out.push_str("## Change from baseline\n\n");
    out.push_str(&format!("![Rate ratio by modality]({})\n\n", RATIO_CHART));

    out.push_str("## Readers\n\n");
    out.push_str(&format!("![Providers by modality]({})\n\n", READERS_CHART));
    out.push_str(&specialty_mix_table(&result.specialty_mix, first, last));

    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
