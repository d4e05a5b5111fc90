//! Procedure-code → modality lookup.
//!
//! The study restricts claims to five fixed, disjoint sets of cardiac imaging
//! HCPCS/CPT codes. [`CodeSets`] holds those sets as a value so aggregators
//! receive them explicitly and tests can substitute their own.

use std::collections::{BTreeSet, HashMap};

use crate::error::{ImagingError, Result};
use crate::models::Modality;

/// Expand an inclusive numeric code range into code strings.
fn code_range(start: u32, end: u32) -> impl Iterator<Item = String> {
    (start..=end).map(|c| c.to_string())
}

fn literals<'a>(codes: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    codes.iter().map(|c| c.to_string())
}

/// The five modality code sets, held in classifier priority order.
#[derive(Debug, Clone)]
pub struct CodeSets {
    sets: Vec<(Modality, BTreeSet<String>)>,
    index: HashMap<String, Modality>,
}

impl CodeSets {
    /// Build code sets from `(modality, codes)` pairs given in priority order.
    ///
    /// Fails with [`ImagingError::OverlappingCodeSets`] when a code appears
    /// under more than one modality.
    pub fn new<I, C>(sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Modality, C)>,
        C: IntoIterator<Item = String>,
    {
        let sets: Vec<(Modality, BTreeSet<String>)> = sets
            .into_iter()
            .map(|(m, codes)| (m, codes.into_iter().map(|c| c.trim().to_string()).collect()))
            .collect();

        let mut index: HashMap<String, Modality> = HashMap::new();
        for (modality, codes) in &sets {
            for code in codes {
                if let Some(first) = index.get(code) {
                    return Err(ImagingError::OverlappingCodeSets {
                        code: code.clone(),
                        first: *first,
                        second: *modality,
                    });
                }
                index.insert(code.clone(), *modality);
            }
        }

        Ok(Self { sets, index })
    }

    /// The study's fixed cardiac imaging code sets, validated for overlap.
    pub fn cardiac_imaging() -> Result<Self> {
        let pet = code_range(78429, 78433).chain(literals(&["78459", "78491", "78492"]));
        let spect = code_range(78451, 78454).chain(literals(&[
            "78466", "78468", "78469", "78472", "78473", "78481", "78483", "78494", "78496",
        ]));
        let ct = code_range(75571, 75574);
        let mri = literals(&["75557", "75559", "75561", "75563", "75565"]);
        let echo = literals(&["93303", "93304"])
            .chain(code_range(93306, 93308))
            .chain(code_range(93312, 93318))
            .chain(literals(&["93350", "93351"]));

        let sets: Vec<(Modality, Vec<String>)> = vec![
            (Modality::Pet, pet.collect()),
            (Modality::Spect, spect.collect()),
            (Modality::Ct, ct.collect()),
            (Modality::Mri, mri.collect()),
            (Modality::Echo, echo.collect()),
        ];

        Self::new(sets)
    }

    /// Classify a code, testing sets in priority order.
    ///
    /// Returns `None` for codes outside every set.
    pub fn classify(&self, code: &str) -> Option<Modality> {
        let code = code.trim();
        self.sets
            .iter()
            .find(|(_, codes)| codes.contains(code))
            .map(|(m, _)| *m)
    }

    /// Whether `code` belongs to the union of all sets.
    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code.trim())
    }

    /// Codes of one modality, sorted.
    pub fn codes(&self, modality: Modality) -> impl Iterator<Item = &str> {
        self.sets
            .iter()
            .filter(move |(m, _)| *m == modality)
            .flat_map(|(_, codes)| codes.iter().map(String::as_str))
    }

    /// Modalities in priority order.
    pub fn modalities(&self) -> impl Iterator<Item = Modality> + '_ {
        self.sets.iter().map(|(m, _)| *m)
    }

    /// Total number of codes across all sets.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
