//! Markdown summary tables.
//!
//! Compares the first and last study years: volume and per-beneficiary rate
//! per modality (plus the pooled total), and the specialty mix of readers and
//! services per modality.

use std::collections::BTreeMap;

use imaging_core::formatting::{self, NOT_AVAILABLE};
use imaging_core::models::{Modality, Series, SpecialtyGroup, SpecialtyMix, UtilizationRow};

/// Decimal places for services-per-beneficiary rates.
const RATE_DECIMALS: u32 = 4;
/// Decimal places for change-from-baseline ratios.
const RATIO_DECIMALS: u32 = 2;

/// Volume and rate at `first` and `last`, one row per series.
///
/// `rows` may mix modality and [`Series::Total`] rows; series appear in
/// their natural order with the total last.
pub fn volume_rate_table(rows: &[UtilizationRow], first: i32, last: i32) -> String {
    let mut by_series: BTreeMap<Series, BTreeMap<i32, &UtilizationRow>> = BTreeMap::new();
    for row in rows {
        by_series.entry(row.series).or_default().insert(row.year, row);
    }

    let headers = [
        "Modality".to_string(),
        format!("Services {}", first),
        format!("Services {}", last),
        format!("Rate {}", first),
        format!("Rate {}", last),
        format!("Ratio {}", last),
    ];

    let body: Vec<Vec<String>> = by_series
        .iter()
        .map(|(series, years)| {
            let at = |year: i32| years.get(&year).copied();
            let volume = |year: i32| {
                at(year)
                    .map(|r| formatting::format_count(r.n))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            };
            let rate = |year: i32| {
                formatting::format_optional(at(year).and_then(|r| r.rate), RATE_DECIMALS)
            };
            vec![
                series.label().to_string(),
                volume(first),
                volume(last),
                rate(first),
                rate(last),
                formatting::format_optional(at(last).and_then(|r| r.ratio), RATIO_DECIMALS),
            ]
        })
        .collect();

    markdown_table(&headers, &body)
}

/// Share of readers and services by specialty at `first` and `last`.
pub fn specialty_mix_table(mix: &[SpecialtyMix], first: i32, last: i32) -> String {
    let mut cells: BTreeMap<(Modality, SpecialtyGroup), BTreeMap<i32, &SpecialtyMix>> =
        BTreeMap::new();
    for m in mix {
        cells.entry((m.modality, m.specialty)).or_default().insert(m.year, m);
    }

    let headers = [
        "Modality".to_string(),
        "Specialty".to_string(),
        format!("Readers {}", first),
        format!("Readers {}", last),
        format!("Services {}", first),
        format!("Services {}", last),
    ];

    let body: Vec<Vec<String>> = cells
        .iter()
        .map(|((modality, specialty), years)| {
            let pct = |year: i32, f: fn(&SpecialtyMix) -> f64| {
                years
                    .get(&year)
                    .copied()
                    .map(|m| formatting::format_percent(f(m)))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            };
            vec![
                modality.label().to_string(),
                specialty.label().to_string(),
                pct(first, |m: &SpecialtyMix| m.pct_readers),
                pct(last, |m: &SpecialtyMix| m.pct_readers),
                pct(first, |m: &SpecialtyMix| m.pct_services),
                pct(last, |m: &SpecialtyMix| m.pct_services),
            ]
        })
        .collect();

    markdown_table(&headers, &body)
}

/// GitHub-flavoured Markdown table; every column after the first is
/// right-aligned.
pub fn markdown_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    let rule: Vec<&str> = (0..headers.len())
        .map(|i| if i == 0 { "---" } else { "---:" })
        .collect();
    out.push_str(&format!("|{}|\n", rule.join("|")));
    for row in rows {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
