use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{ImagingError, Result};
use crate::models::{EnrollmentRecord, Series, UtilizationRow, VolumeCell};

/// What to do when a year with volume has no usable enrollment total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrollmentPolicy {
    /// Leave rate, baseline and ratio as `None` for affected cells.
    #[default]
    Propagate,
    /// Abort with [`ImagingError::MissingEnrollment`].
    Strict,
}

/// Divide, returning `None` for a zero denominator or a non-finite result.
pub fn checked_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

// ── RateCalculator ────────────────────────────────────────────────────────────

/// Stateless per-beneficiary rate and change-from-baseline calculations.
pub struct RateCalculator;

impl RateCalculator {
    /// Index enrollment records by year. A later record for the same year
    /// replaces an earlier one.
    pub fn enrollment_by_year(records: &[EnrollmentRecord]) -> BTreeMap<i32, Option<u64>> {
        let mut map = BTreeMap::new();
        for record in records {
            if map.insert(record.year, record.n_part_b).is_some() {
                warn!("Duplicate enrollment total for {}; using the last one", record.year);
            }
        }
        map
    }

    /// Pool per-modality cells into one [`Series::Total`] cell per year.
    pub fn pooled_total(cells: &[VolumeCell]) -> Vec<VolumeCell> {
        let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
        for cell in cells {
            *by_year.entry(cell.year).or_default() += cell.n;
        }
        by_year
            .into_iter()
            .map(|(year, n)| VolumeCell {
                year,
                series: Series::Total,
                n,
            })
            .collect()
    }

    /// Compute share, rate, baseline rate and ratio for every cell.
    ///
    /// * `prop` is the cell's percent of its year's total across all series in
    ///   `cells` (0 when the year's total is 0).
    /// * `rate` is `n / n_part_b` for the cell's year.
    /// * `baseline_rate` is the same series' rate in `baseline_year`, so it is
    ///   constant across the series' years.
    /// * `ratio` is `rate / baseline_rate`.
    ///
    /// Cells that share a `(year, series)` key are summed first. Rows come
    /// back ordered by series, then year.
    pub fn utilization(
        cells: &[VolumeCell],
        enrollment: &[EnrollmentRecord],
        baseline_year: i32,
        policy: EnrollmentPolicy,
    ) -> Result<Vec<UtilizationRow>> {
        let mut volume: BTreeMap<(Series, i32), u64> = BTreeMap::new();
        let mut year_totals: BTreeMap<i32, u64> = BTreeMap::new();
        for cell in cells {
            *volume.entry((cell.series, cell.year)).or_default() += cell.n;
            *year_totals.entry(cell.year).or_default() += cell.n;
        }

        let beneficiaries = Self::enrollment_by_year(enrollment);
        let mut missing: BTreeSet<i32> = BTreeSet::new();
        let reported = |year: i32| beneficiaries.get(&year).copied().flatten();
        // A zero count is as unusable as an absent one.
        let part_b = |year: i32| reported(year).filter(|d| *d > 0);

        for year in year_totals.keys() {
            if part_b(*year).is_none() {
                missing.insert(*year);
            }
        }
        if let Some(year) = missing.first() {
            match policy {
                EnrollmentPolicy::Strict => return Err(ImagingError::MissingEnrollment(*year)),
                EnrollmentPolicy::Propagate => warn!(
                    "No national enrollment total for years {:?}; rates unavailable",
                    missing
                ),
            }
        }

        let rate_of =
            |n: u64, year: i32| part_b(year).and_then(|d| checked_ratio(n as f64, d as f64));

        let baselines: BTreeMap<Series, Option<f64>> = volume
            .iter()
            .filter(|((_, year), _)| *year == baseline_year)
            .map(|((series, year), n)| (*series, rate_of(*n, *year)))
            .collect();

        let series_seen: BTreeSet<Series> = volume.keys().map(|(series, _)| *series).collect();
        for series in &series_seen {
            match baselines.get(series) {
                Some(Some(_)) => {}
                Some(None) => {
                    warn!("{} has no usable rate in baseline year {}", series, baseline_year)
                }
                None => match policy {
                    EnrollmentPolicy::Strict => {
                        return Err(ImagingError::MissingBaseline {
                            series: *series,
                            year: baseline_year,
                        })
                    }
                    EnrollmentPolicy::Propagate => warn!(
                        "{} has no volume in baseline year {}; ratios unavailable",
                        series, baseline_year
                    ),
                },
            }
        }

        let mut rows = Vec::with_capacity(volume.len());
        for ((series, year), n) in &volume {
            let baseline_rate = baselines.get(series).copied().flatten();
            let rate = rate_of(*n, *year);
            let ratio = match (rate, baseline_rate) {
                (Some(r), Some(b)) => checked_ratio(r, b),
                _ => None,
            };
            let year_total = year_totals.get(year).copied().unwrap_or(0);
            let prop = checked_ratio(*n as f64, year_total as f64).map_or(0.0, |p| p * 100.0);

            rows.push(UtilizationRow {
                year: *year,
                series: *series,
                n: *n,
                prop,
                n_part_b: reported(*year),
                rate,
                baseline_rate,
                ratio,
            });
        }

        Ok(rows)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Modality;

    fn cell(year: i32, modality: Modality, n: u64) -> VolumeCell {
        VolumeCell {
            year,
            series: Series::Modality(modality),
            n,
        }
    }

    fn enrolled(year: i32, n: u64) -> EnrollmentRecord {
        EnrollmentRecord {
            year,
            n_part_b: Some(n),
        }
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    // ── checked_ratio ─────────────────────────────────────────────────────────

    #[test]
    fn test_checked_ratio() {
        assert_eq!(checked_ratio(1.0, 4.0), Some(0.25));
        assert_eq!(checked_ratio(1.0, 0.0), None);
        assert_eq!(checked_ratio(0.0, 0.0), None);
        assert_eq!(checked_ratio(f64::INFINITY, 1.0), None);
    }

    // ── utilization ───────────────────────────────────────────────────────────

    #[test]
    fn test_echo_two_years() {
        let cells = vec![cell(2013, Modality::Echo, 100), cell(2014, Modality::Echo, 150)];
        let enrollment = vec![enrolled(2013, 1000), enrolled(2014, 1200)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 2013);
        assert_eq!(rows[0].n, 100);
        assert!(approx(rows[0].rate, 0.1));
        assert!(approx(rows[0].baseline_rate, 0.1));
        assert!(approx(rows[0].ratio, 1.0));

        assert_eq!(rows[1].year, 2014);
        assert_eq!(rows[1].n, 150);
        assert!(approx(rows[1].rate, 0.125));
        assert!(approx(rows[1].baseline_rate, 0.1));
        assert!(approx(rows[1].ratio, 1.25));
    }

    #[test]
    fn test_prop_sums_to_100_per_year() {
        let cells = vec![
            cell(2013, Modality::Echo, 700),
            cell(2013, Modality::Spect, 200),
            cell(2013, Modality::Ct, 100),
            cell(2014, Modality::Echo, 3),
            cell(2014, Modality::Pet, 4),
        ];
        let enrollment = vec![enrolled(2013, 10), enrolled(2014, 10)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();

        for year in [2013, 2014] {
            let sum: f64 = rows.iter().filter(|r| r.year == year).map(|r| r.prop).sum();
            assert!((sum - 100.0).abs() < 1e-9, "year {year}: {sum}");
        }
        let echo_2013 = rows
            .iter()
            .find(|r| r.year == 2013 && r.series == Series::Modality(Modality::Echo))
            .unwrap();
        assert!((echo_2013.prop - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_constant_and_ratio_one_in_baseline_year() {
        let cells = vec![
            cell(2013, Modality::Ct, 50),
            cell(2014, Modality::Ct, 80),
            cell(2015, Modality::Ct, 120),
        ];
        let enrollment = vec![enrolled(2013, 500), enrolled(2014, 520), enrolled(2015, 540)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();

        let baseline = rows[0].baseline_rate.unwrap();
        assert!(rows.iter().all(|r| r.baseline_rate == Some(baseline)));
        assert!(approx(rows[0].ratio, 1.0));
    }

    #[test]
    fn test_missing_enrollment_propagates_none() {
        let cells = vec![cell(2013, Modality::Mri, 10), cell(2014, Modality::Mri, 20)];
        let enrollment = vec![enrolled(2013, 100)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();

        assert!(approx(rows[0].ratio, 1.0));
        assert_eq!(rows[1].n_part_b, None);
        assert_eq!(rows[1].rate, None);
        assert_eq!(rows[1].ratio, None);
        assert!(approx(rows[1].baseline_rate, 0.1));
    }

    #[test]
    fn test_missing_baseline_enrollment_nulls_every_ratio() {
        let cells = vec![cell(2013, Modality::Mri, 10), cell(2014, Modality::Mri, 20)];
        let enrollment = vec![enrolled(2014, 100)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();

        assert!(rows.iter().all(|r| r.baseline_rate.is_none()));
        assert!(rows.iter().all(|r| r.ratio.is_none()));
        assert!(approx(rows[1].rate, 0.2));
    }

    #[test]
    fn test_zero_enrollment_is_not_available() {
        let cells = vec![cell(2013, Modality::Pet, 10)];
        let enrollment = vec![enrolled(2013, 0)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();
        assert_eq!(rows[0].rate, None);
        assert_eq!(rows[0].ratio, None);
    }

    #[test]
    fn test_zero_enrollment_fails_strict() {
        let cells = vec![cell(2013, Modality::Pet, 10)];
        let enrollment = vec![enrolled(2013, 0)];
        let err = RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, ImagingError::MissingEnrollment(2013)));
    }

    #[test]
    fn test_zero_enrollment_still_reported() {
        let cells = vec![cell(2013, Modality::Pet, 10)];
        let enrollment = vec![enrolled(2013, 0)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();
        assert_eq!(rows[0].n_part_b, Some(0));
    }

    #[test]
    fn test_series_without_baseline_cell_propagates_none() {
        let cells = vec![cell(2013, Modality::Echo, 10), cell(2014, Modality::Ct, 20)];
        let enrollment = vec![enrolled(2013, 100), enrolled(2014, 100)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();

        let ct = rows
            .iter()
            .find(|r| r.series == Series::Modality(Modality::Ct))
            .unwrap();
        assert!(approx(ct.rate, 0.2));
        assert_eq!(ct.baseline_rate, None);
        assert_eq!(ct.ratio, None);
    }

    #[test]
    fn test_series_without_baseline_cell_fails_strict() {
        let cells = vec![cell(2013, Modality::Echo, 10), cell(2014, Modality::Ct, 20)];
        let enrollment = vec![enrolled(2013, 100), enrolled(2014, 100)];
        let err = RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Strict)
            .unwrap_err();
        match err {
            ImagingError::MissingBaseline { series, year } => {
                assert_eq!(series, Series::Modality(Modality::Ct));
                assert_eq!(year, 2013);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_enrollment_is_missing() {
        let cells = vec![cell(2013, Modality::Pet, 10)];
        let enrollment = vec![EnrollmentRecord {
            year: 2013,
            n_part_b: None,
        }];
        let err = RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, ImagingError::MissingEnrollment(2013)));
    }

    #[test]
    fn test_strict_policy_fails_on_first_missing_year() {
        let cells = vec![
            cell(2013, Modality::Echo, 1),
            cell(2015, Modality::Echo, 1),
            cell(2014, Modality::Echo, 1),
        ];
        let enrollment = vec![enrolled(2013, 10)];
        let err = RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, ImagingError::MissingEnrollment(2014)));
    }

    #[test]
    fn test_duplicate_cells_are_summed() {
        let cells = vec![cell(2013, Modality::Echo, 40), cell(2013, Modality::Echo, 60)];
        let enrollment = vec![enrolled(2013, 1000)];
        let rows =
            RateCalculator::utilization(&cells, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].n, 100);
    }

    // ── pooled_total ──────────────────────────────────────────────────────────

    #[test]
    fn test_pooled_total() {
        let cells = vec![
            cell(2014, Modality::Echo, 5),
            cell(2013, Modality::Echo, 1),
            cell(2013, Modality::Ct, 2),
        ];
        let total = RateCalculator::pooled_total(&cells);
        assert_eq!(total.len(), 2);
        assert_eq!(total[0].year, 2013);
        assert_eq!(total[0].n, 3);
        assert_eq!(total[0].series, Series::Total);
        assert_eq!(total[1].n, 5);

        let enrollment = vec![enrolled(2013, 30), enrolled(2014, 25)];
        let rows =
            RateCalculator::utilization(&total, &enrollment, 2013, EnrollmentPolicy::Propagate)
                .unwrap();
        assert!(rows.iter().all(|r| (r.prop - 100.0).abs() < 1e-9));
        assert!(approx(rows[1].ratio, 2.0));
    }

    #[test]
    fn test_enrollment_by_year_last_wins() {
        let map = RateCalculator::enrollment_by_year(&[enrolled(2013, 1), enrolled(2013, 2)]);
        assert_eq!(map.get(&2013), Some(&Some(2)));
    }
}
