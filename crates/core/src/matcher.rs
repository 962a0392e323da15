use crate::error::GuardError;
use crate::registry::Registry;
use crate::scanner::Usage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimum similarity for a registry name to be offered as a suggestion.
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// A usage of a name the registry does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub usage: Usage,
    pub suggestion: Option<String>,
    /// Similarity of the closest registry name, whether or not it was
    /// suggested. `0.0` when the registry is empty.
    pub similarity_score: f64,
}

impl Issue {
    #[must_use]
    pub fn variable_name(&self) -> &str {
        &self.usage.variable_name
    }

    #[must_use]
    pub fn is_fixable(&self) -> bool {
        self.suggestion.is_some()
    }
}

/// Classifies usages against a [`Registry`] and ranks correction candidates by
/// normalized Levenshtein similarity (`1 - distance / longer_length`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matcher {
    threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Matcher {
    /// # Errors
    ///
    /// Returns an error if `threshold` is not within `0.0..=1.0`.
    pub fn new(threshold: f64) -> Result<Self, GuardError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GuardError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    /// Returns `None` for known names and an [`Issue`] otherwise.
    #[must_use]
    pub fn match_usage(&self, usage: &Usage, registry: &Registry) -> Option<Issue> {
        if registry.contains(&usage.variable_name) {
            return None;
        }

        let closest = self.closest(&usage.variable_name, registry);
        let similarity_score = closest.map_or(0.0, |(_, score)| score);
        let suggestion = closest
            .filter(|(_, score)| *score >= self.threshold)
            .map(|(name, _)| name.to_string());

        Some(Issue {
            usage: usage.clone(),
            suggestion,
            similarity_score,
        })
    }

    /// The most similar declared name and its score, ignoring the threshold.
    ///
    /// Ties go to the shorter name, then to the lexicographically smaller one.
    #[must_use]
    pub fn closest<'a>(&self, name: &str, registry: &'a Registry) -> Option<(&'a str, f64)> {
        registry
            .names()
            .map(|candidate| (candidate, strsim::normalized_levenshtein(name, candidate)))
            .min_by(|(a, a_score), (b, b_score)| rank(a, *a_score, b, *b_score))
    }
}

fn rank(a: &str, a_score: f64, b: &str, b_score: f64) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| a.len().cmp(&b.len()))
        .then_with(|| a.cmp(b))
}
