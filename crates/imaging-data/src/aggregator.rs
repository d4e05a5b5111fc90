//! Filtering, classification and grouping of loaded claims records.
//!
//! [`NationalAggregator`] feeds total-volume figures; [`ProviderAggregator`]
//! additionally buckets providers by specialty and feeds reader-count and
//! specialty-mix figures. All grouping goes through ordered maps, so results
//! do not depend on the order records were loaded in.

use std::collections::{BTreeMap, HashSet};

use imaging_core::codes::CodeSets;
use imaging_core::models::{
    ImagingService, Modality, ProviderImagingService, ProviderServiceRecord, ReaderCount,
    Series, ServiceRecord, SpecialtyGroup, SpecialtyMix, VolumeCell,
};
use imaging_core::specialty::SpecialtyRules;
use tracing::debug;

/// Any classified record that contributes services to a (year, modality) cell.
pub trait ServiceLike {
    fn year(&self) -> i32;
    fn modality(&self) -> Modality;
    fn n_services(&self) -> u64;
}

impl ServiceLike for ImagingService {
    fn year(&self) -> i32 {
        self.year
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn n_services(&self) -> u64 {
        self.n_services
    }
}

impl ServiceLike for ProviderImagingService {
    fn year(&self) -> i32 {
        self.year
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn n_services(&self) -> u64 {
        self.n_services
    }
}

/// Sum services per (year, modality), sorted by year then modality.
pub fn volume_by_year_modality<S: ServiceLike>(services: &[S]) -> Vec<VolumeCell> {
    let mut map: BTreeMap<(i32, Modality), u64> = BTreeMap::new();
    for service in services {
        *map.entry((service.year(), service.modality())).or_default() += service.n_services();
    }
    map.into_iter()
        .map(|((year, modality), n)| VolumeCell {
            year,
            series: Series::Modality(modality),
            n,
        })
        .collect()
}

// ── NationalAggregator ────────────────────────────────────────────────────────

/// Restricts national records to imaging codes and tags their modality.
pub struct NationalAggregator<'a> {
    codes: &'a CodeSets,
}

impl<'a> NationalAggregator<'a> {
    pub fn new(codes: &'a CodeSets) -> Self {
        Self { codes }
    }

    /// Keep records whose code is in a modality set; drop the rest.
    pub fn classify(&self, records: Vec<ServiceRecord>) -> Vec<ImagingService> {
        let total = records.len();
        let services: Vec<ImagingService> = records
            .into_iter()
            .filter_map(|r| {
                let modality = self.codes.classify(&r.code)?;
                Some(ImagingService {
                    year: r.year,
                    code: r.code.trim().to_string(),
                    modality,
                    n_services: r.n_services,
                })
            })
            .collect();

        debug!(
            "National: kept {} of {} records ({} unmatched codes dropped)",
            services.len(),
            total,
            total - services.len()
        );
        services
    }
}

// ── ProviderAggregator ────────────────────────────────────────────────────────

/// Restricts provider records to imaging codes and tags modality and
/// specialty group.
pub struct ProviderAggregator<'a> {
    codes: &'a CodeSets,
    rules: &'a SpecialtyRules,
}

impl<'a> ProviderAggregator<'a> {
    pub fn new(codes: &'a CodeSets, rules: &'a SpecialtyRules) -> Self {
        Self { codes, rules }
    }

    /// Keep records whose code is in a modality set and classify the
    /// provider's specialty.
    pub fn classify(&self, records: Vec<ProviderServiceRecord>) -> Vec<ProviderImagingService> {
        let total = records.len();
        // Provider types repeat heavily; classify each distinct text once.
        let mut specialty_cache: BTreeMap<String, SpecialtyGroup> = BTreeMap::new();

        let services: Vec<ProviderImagingService> = records
            .into_iter()
            .filter_map(|r| {
                let modality = self.codes.classify(&r.code)?;
                let specialty = *specialty_cache
                    .entry(r.provider_type.clone())
                    .or_insert_with(|| self.rules.classify(&r.provider_type));
                Some(ProviderImagingService {
                    year: r.year,
                    npi: r.npi,
                    provider_type: r.provider_type,
                    credentials: r.credentials,
                    gender: r.gender,
                    code: r.code.trim().to_string(),
                    modality,
                    specialty,
                    n_services: r.n_services,
                })
            })
            .collect();

        debug!(
            "Provider: kept {} of {} records across {} provider types",
            services.len(),
            total,
            specialty_cache.len()
        );
        services
    }

    /// Distinct providers per (year, modality), followed by distinct
    /// providers per year across all modalities as [`Series::Total`].
    pub fn reader_counts(services: &[ProviderImagingService]) -> Vec<ReaderCount> {
        let mut readers: BTreeMap<(Series, i32), HashSet<&str>> = BTreeMap::new();
        for s in services {
            readers
                .entry((Series::Modality(s.modality), s.year))
                .or_default()
                .insert(s.npi.as_str());
            readers
                .entry((Series::Total, s.year))
                .or_default()
                .insert(s.npi.as_str());
        }
        readers
            .into_iter()
            .map(|((series, year), npis)| ReaderCount {
                year,
                series,
                n_readers: npis.len() as u64,
            })
            .collect()
    }

    /// Specialty breakdown per (year, modality).
    ///
    /// Every cell lists all three specialty groups (zeros included) and its
    /// percentages sum to 100 unless the cell is empty.
    pub fn specialty_mix(services: &[ProviderImagingService]) -> Vec<SpecialtyMix> {
        #[derive(Default)]
        struct Tally<'s> {
            readers: HashSet<&'s str>,
            n_services: u64,
        }

        let mut cells: BTreeMap<(i32, Modality), BTreeMap<SpecialtyGroup, Tally<'_>>> =
            BTreeMap::new();
        for s in services {
            let tally = cells
                .entry((s.year, s.modality))
                .or_default()
                .entry(s.specialty)
                .or_default();
            tally.readers.insert(s.npi.as_str());
            tally.n_services += s.n_services;
        }

        let mut mix = Vec::new();
        for ((year, modality), groups) in cells {
            let cell_readers: u64 = groups.values().map(|t| t.readers.len() as u64).sum();
            let cell_services: u64 = groups.values().map(|t| t.n_services).sum();

            for specialty in SpecialtyGroup::ALL {
                let (n_readers, n_services) = groups
                    .get(&specialty)
                    .map(|t| (t.readers.len() as u64, t.n_services))
                    .unwrap_or((0, 0));
                mix.push(SpecialtyMix {
                    year,
                    modality,
                    specialty,
                    n_readers,
                    n_services,
                    pct_readers: share(n_readers, cell_readers),
                    pct_services: share(n_services, cell_services),
                });
            }
        }
        mix
    }
}

fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn national(year: i32, code: &str, n: u64) -> ServiceRecord {
        ServiceRecord {
            year,
            code: code.to_string(),
            n_services: n,
        }
    }

    fn provider(year: i32, npi: &str, provider_type: &str, code: &str, n: u64) -> ProviderServiceRecord {
        ProviderServiceRecord {
            year,
            npi: npi.to_string(),
            provider_type: provider_type.to_string(),
            credentials: "MD".to_string(),
            gender: "F".to_string(),
            code: code.to_string(),
            n_services: n,
        }
    }

    fn codes() -> CodeSets {
        CodeSets::cardiac_imaging().unwrap()
    }

    fn rules() -> SpecialtyRules {
        SpecialtyRules::cardiac_imaging().unwrap()
    }

    // ── NationalAggregator ────────────────────────────────────────────────────

    #[test]
    fn test_national_drops_unmatched_codes() {
        let codes = codes();
        let services = NationalAggregator::new(&codes).classify(vec![
            national(2013, "93303", 100),
            national(2013, "99213", 5000),
            national(2013, "78451", 40),
        ]);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].modality, Modality::Echo);
        assert_eq!(services[1].modality, Modality::Spect);
    }

    #[test]
    fn test_volume_by_year_modality() {
        let codes = codes();
        let services = NationalAggregator::new(&codes).classify(vec![
            national(2014, "93306", 10),
            national(2013, "93303", 100),
            national(2013, "93306", 50),
            national(2013, "75571", 7),
        ]);
        let cells = volume_by_year_modality(&services);
        assert_eq!(
            cells,
            vec![
                VolumeCell {
                    year: 2013,
                    series: Series::Modality(Modality::Ct),
                    n: 7
                },
                VolumeCell {
                    year: 2013,
                    series: Series::Modality(Modality::Echo),
                    n: 150
                },
                VolumeCell {
                    year: 2014,
                    series: Series::Modality(Modality::Echo),
                    n: 10
                },
            ]
        );
    }

    #[test]
    fn test_volume_independent_of_record_order() {
        let codes = codes();
        let records = vec![
            national(2015, "75572", 3),
            national(2013, "78452", 9),
            national(2014, "93350", 4),
            national(2013, "78452", 1),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let agg = NationalAggregator::new(&codes);
        let forward = volume_by_year_modality(&agg.classify(records));
        let backward = volume_by_year_modality(&agg.classify(reversed));
        assert_eq!(forward, backward);
    }

    // ── ProviderAggregator ────────────────────────────────────────────────────

    #[test]
    fn test_provider_classify_assigns_specialty() {
        let codes = codes();
        let rules = rules();
        let services = ProviderAggregator::new(&codes, &rules).classify(vec![
            provider(2013, "1", "Cardiatric Electrophysiology", "93306", 5),
            provider(2013, "2", "Diagnostic Radiology", "75571", 5),
            provider(2013, "3", "Family Medicine", "93306", 5),
            provider(2013, "4", "Family Medicine", "99213", 5),
        ]);
        let specialties: Vec<SpecialtyGroup> = services.iter().map(|s| s.specialty).collect();
        assert_eq!(
            specialties,
            vec![
                SpecialtyGroup::Cardiology,
                SpecialtyGroup::Radiology,
                SpecialtyGroup::Other
            ]
        );
        assert_eq!(services[0].provider_type, "Cardiatric Electrophysiology");
    }

    #[test]
    fn test_reader_counts_distinct_npis() {
        let codes = codes();
        let rules = rules();
        let services = ProviderAggregator::new(&codes, &rules).classify(vec![
            provider(2013, "1", "Cardiology", "93306", 5),
            provider(2013, "1", "Cardiology", "93303", 5),
            provider(2013, "2", "Cardiology", "93306", 5),
            provider(2013, "1", "Cardiology", "78452", 5),
            provider(2014, "3", "Cardiology", "93306", 5),
        ]);
        let counts = ProviderAggregator::reader_counts(&services);

        let get = |series: Series, year: i32| {
            counts
                .iter()
                .find(|c| c.series == series && c.year == year)
                .map(|c| c.n_readers)
        };
        assert_eq!(get(Series::Modality(Modality::Echo), 2013), Some(2));
        assert_eq!(get(Series::Modality(Modality::Spect), 2013), Some(1));
        assert_eq!(get(Series::Total, 2013), Some(2));
        assert_eq!(get(Series::Modality(Modality::Echo), 2014), Some(1));
        assert_eq!(get(Series::Modality(Modality::Pet), 2013), None);
    }

    #[test]
    fn test_specialty_mix_percentages() {
        let codes = codes();
        let rules = rules();
        let services = ProviderAggregator::new(&codes, &rules).classify(vec![
            provider(2013, "1", "Cardiology", "93306", 60),
            provider(2013, "2", "Cardiology", "93306", 15),
            provider(2013, "3", "Diagnostic Radiology", "93306", 25),
            provider(2013, "4", "Diagnostic Radiology", "75571", 8),
        ]);
        let mix = ProviderAggregator::specialty_mix(&services);

        // Two cells, three specialties each.
        assert_eq!(mix.len(), 6);

        let echo: Vec<&SpecialtyMix> = mix.iter().filter(|m| m.modality == Modality::Echo).collect();
        assert_eq!(echo[0].specialty, SpecialtyGroup::Cardiology);
        assert_eq!(echo[0].n_readers, 2);
        assert_eq!(echo[0].n_services, 75);
        assert!((echo[0].pct_services - 75.0).abs() < 1e-9);
        assert!((echo[0].pct_readers - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(echo[2].specialty, SpecialtyGroup::Other);
        assert_eq!(echo[2].n_readers, 0);
        assert_eq!(echo[2].pct_services, 0.0);

        let pct_sum: f64 = echo.iter().map(|m| m.pct_services).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);

        let ct: Vec<&SpecialtyMix> = mix.iter().filter(|m| m.modality == Modality::Ct).collect();
        assert!((ct[1].pct_readers - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_specialty_mix_empty() {
        assert!(ProviderAggregator::specialty_mix(&[]).is_empty());
        assert!(ProviderAggregator::reader_counts(&[]).is_empty());
    }
}
