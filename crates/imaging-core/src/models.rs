use serde::{Deserialize, Serialize};
use std::fmt;

/// Imaging technology a procedure code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modality {
    #[serde(rename = "PET")]
    Pet,
    #[serde(rename = "SPECT")]
    Spect,
    #[serde(rename = "CT")]
    Ct,
    #[serde(rename = "MRI")]
    Mri,
    Echo,
}

impl Modality {
    /// All modalities in classifier priority order.
    pub const ALL: [Modality; 5] = [
        Modality::Pet,
        Modality::Spect,
        Modality::Ct,
        Modality::Mri,
        Modality::Echo,
    ];

    /// Display label used in charts and tables.
    pub fn label(&self) -> &'static str {
        match self {
            Modality::Pet => "PET",
            Modality::Spect => "SPECT",
            Modality::Ct => "CT",
            Modality::Mri => "MRI",
            Modality::Echo => "Echo",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A time series in the output: one modality, or all modalities pooled.
///
/// Orders modalities first (in priority order) and `Total` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Series {
    Modality(Modality),
    Total,
}

impl Series {
    pub fn label(&self) -> &'static str {
        match self {
            Series::Modality(m) => m.label(),
            Series::Total => "Total",
        }
    }
}

impl From<Modality> for Series {
    fn from(m: Modality) -> Self {
        Series::Modality(m)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse specialty bucket derived from a provider's free-text type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecialtyGroup {
    Cardiology,
    Radiology,
    Other,
}

impl SpecialtyGroup {
    pub const ALL: [SpecialtyGroup; 3] = [
        SpecialtyGroup::Cardiology,
        SpecialtyGroup::Radiology,
        SpecialtyGroup::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SpecialtyGroup::Cardiology => "Cardiology",
            SpecialtyGroup::Radiology => "Radiology",
            SpecialtyGroup::Other => "Other",
        }
    }
}

impl fmt::Display for SpecialtyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Loaded records ────────────────────────────────────────────────────────────

/// One row of a national by-service summary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Year of the source file the row came from.
    pub year: i32,
    /// HCPCS/CPT procedure code.
    pub code: String,
    /// Total services billed nationally for the code.
    pub n_services: u64,
}

/// One row of a provider-level by-service summary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderServiceRecord {
    /// Year of the source file the row came from.
    pub year: i32,
    /// National Provider Identifier.
    pub npi: String,
    /// Free-text provider type, e.g. `"Diagnostic Radiology"`.
    pub provider_type: String,
    #[serde(default)]
    pub credentials: String,
    #[serde(default)]
    pub gender: String,
    /// HCPCS/CPT procedure code.
    pub code: String,
    /// Services billed by this provider for the code.
    pub n_services: u64,
}

/// Annual national Part B enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub year: i32,
    /// Beneficiary count; `None` when the source value is not numeric.
    pub n_part_b: Option<u64>,
}

// ── Classified records ────────────────────────────────────────────────────────

/// A national record restricted to an imaging code and tagged with its modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagingService {
    pub year: i32,
    pub code: String,
    pub modality: Modality,
    pub n_services: u64,
}

/// A provider record restricted to an imaging code, tagged with modality and
/// specialty group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderImagingService {
    pub year: i32,
    pub npi: String,
    pub provider_type: String,
    pub credentials: String,
    pub gender: String,
    pub code: String,
    pub modality: Modality,
    pub specialty: SpecialtyGroup,
    pub n_services: u64,
}

// ── Derived aggregates ────────────────────────────────────────────────────────

/// Summed service volume for one (year, series) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeCell {
    pub year: i32,
    pub series: Series,
    pub n: u64,
}

/// Volume, share, per-beneficiary rate and change-from-baseline for one
/// (year, series) cell.
///
/// Rate fields are `None` when enrollment for the year (or the baseline year)
/// is unavailable or zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationRow {
    pub year: i32,
    pub series: Series,
    /// Summed services.
    pub n: u64,
    /// Percent share of the year's total across modalities.
    pub prop: f64,
    /// Part B beneficiaries in the year.
    pub n_part_b: Option<u64>,
    /// Services per beneficiary.
    pub rate: Option<f64>,
    /// Rate of the same series in the baseline year.
    pub baseline_rate: Option<f64>,
    /// `rate / baseline_rate`.
    pub ratio: Option<f64>,
}

/// Distinct billing providers for one (year, series) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderCount {
    pub year: i32,
    pub series: Series,
    pub n_readers: u64,
}

/// Specialty breakdown of one (year, modality) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecialtyMix {
    pub year: i32,
    pub modality: Modality,
    pub specialty: SpecialtyGroup,
    pub n_readers: u64,
    pub n_services: u64,
    /// Share of the cell's distinct readers, in percent.
    pub pct_readers: f64,
    /// Share of the cell's services, in percent.
    pub pct_services: f64,
}
