//! Provider-type → specialty group classification.

use regex::Regex;

use crate::error::{ImagingError, Result};
use crate::models::SpecialtyGroup;

/// Ordered substring rules mapping free-text provider types to a
/// [`SpecialtyGroup`]. The first matching rule wins; anything unmatched is
/// [`SpecialtyGroup::Other`].
#[derive(Debug, Clone)]
pub struct SpecialtyRules {
    /// `(pattern, replacement)` applied to the provider type before matching.
    corrections: Vec<(Regex, String)>,
    /// Lower-cased patterns per group, in evaluation order.
    rules: Vec<(SpecialtyGroup, Vec<String>)>,
}

impl SpecialtyRules {
    /// Build a rule list. Patterns are matched case-insensitively as substrings.
    pub fn new<I, P>(rules: I) -> Self
    where
        I: IntoIterator<Item = (SpecialtyGroup, P)>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let rules: Vec<(SpecialtyGroup, Vec<String>)> = rules
            .into_iter()
            .map(|(group, patterns)| {
                let patterns: Vec<String> = patterns
                    .into_iter()
                    .map(|p| p.as_ref().to_lowercase())
                    .collect();
                (group, patterns)
            })
            .collect();
        Self {
            corrections: Vec::new(),
            rules,
        }
    }

    /// Add a case-insensitive spelling correction applied before matching.
    pub fn with_correction(mut self, misspelling: &str, replacement: &str) -> Result<Self> {
        let pattern = format!("(?i){}", regex::escape(misspelling));
        let re = Regex::new(&pattern)
            .map_err(|e| ImagingError::Config(format!("bad correction {misspelling:?}: {e}")))?;
        self.corrections.push((re, replacement.to_string()));
        Ok(self)
    }

    /// The study's rules: cardiology before radiology, with the CMS
    /// "Cardiatric" misspelling folded into "cardiac".
    pub fn cardiac_imaging() -> Result<Self> {
        Self::new([
            (
                SpecialtyGroup::Cardiology,
                vec![
                    "Heart",
                    "Cardio",
                    "Cardiac electro",
                    "Interventional Cardiology",
                ],
            ),
            (SpecialtyGroup::Radiology, vec!["Radio", "Nuclear"]),
        ])
        .with_correction("cardiatric", "cardiac")
    }

    /// Apply spelling corrections to a provider type.
    pub fn normalize(&self, provider_type: &str) -> String {
        let mut text = provider_type.to_string();
        for (re, replacement) in &self.corrections {
            text = re.replace_all(&text, replacement.as_str()).into_owned();
        }
        text
    }

    /// Classify a provider type.
    pub fn classify(&self, provider_type: &str) -> SpecialtyGroup {
        let normalized = self.normalize(provider_type).to_lowercase();
        self.rules
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| normalized.contains(p.as_str())))
            .map(|(group, _)| *group)
            .unwrap_or(SpecialtyGroup::Other)
    }
}
