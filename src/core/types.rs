// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Name of a condition as it appears in the training table's label column.
pub type DiseaseLabel = String;

/// A normalized symptom identifier: lowercase, trimmed, with every run of
/// non-alphanumeric characters collapsed into a single underscore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomName(String);

impl SymptomName {
    /// Normalizes `raw`. Returns `None` when nothing alphanumeric is left.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `_`-separated words of the name.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split('_')
    }
}

impl fmt::Display for SymptomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SymptomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SymptomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shared normalization for vocabulary columns and user phrases.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }
    out
}

/// One case of the training table: a feature vector over the vocabulary plus its label.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub features: Vec<bool>,
    pub label: DiseaseLabel,
}

/// A vocabulary entry offered to the user as a near miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub symptom: SymptomName,
    pub score: f64,
}

/// Outcome of matching one user phrase against the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchResult {
    Matched(SymptomName),
    Suggestions(Vec<Suggestion>),
    NoMatch,
}

impl MatchResult {
    pub fn matched(&self) -> Option<&SymptomName> {
        match self {
            Self::Matched(name) => Some(name),
            _ => None,
        }
    }
}

/// One phrase of a multi-symptom input together with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseMatch {
    pub phrase: String,
    pub result: MatchResult,
}

/// Symptoms confirmed present for one diagnosis request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentSymptomSet(BTreeSet<SymptomName>);

impl PresentSymptomSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every `Matched` outcome; suggestions and misses stay with the caller.
    pub fn from_matches<'a>(matches: impl IntoIterator<Item = &'a PhraseMatch>) -> Self {
        matches
            .into_iter()
            .filter_map(|m| m.result.matched().cloned())
            .collect()
    }

    pub fn insert(&mut self, symptom: SymptomName) -> bool {
        self.0.insert(symptom)
    }

    pub fn contains(&self, symptom: &SymptomName) -> bool {
        self.0.contains(symptom)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymptomName> {
        self.0.iter()
    }
}

impl FromIterator<SymptomName> for PresentSymptomSet {
    fn from_iter<I: IntoIterator<Item = SymptomName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A disease with its raw class probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDisease {
    pub disease: DiseaseLabel,
    pub confidence: f64,
}

/// Top diseases ordered by descending confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prediction(Vec<RankedDisease>);

impl Prediction {
    pub(crate) fn from_ranked(ranked: Vec<RankedDisease>) -> Self {
        Self(ranked)
    }

    pub fn top(&self) -> Option<&RankedDisease> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedDisease> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("  High Fever "), "high_fever");
        assert_eq!(normalize("cold_hands_and_feets"), "cold_hands_and_feets");
        assert_eq!(normalize("Pain -- behind  the eyes"), "pain_behind_the_eyes");
        assert_eq!(normalize("__spotting__ urination"), "spotting_urination");
        assert_eq!(normalize("!!"), "");
    }

    #[test]
    fn symptom_name_rejects_blank_input() {
        assert!(SymptomName::new("  ").is_none());
        let name = SymptomName::new("Skin Rash").unwrap();
        assert_eq!(name.as_str(), "skin_rash");
        assert_eq!(name.tokens().collect::<Vec<_>>(), vec!["skin", "rash"]);
    }

    #[test]
    fn present_set_keeps_only_matched_phrases() {
        let matches = vec![
            PhraseMatch {
                phrase: "fever".into(),
                result: MatchResult::Matched(SymptomName::new("high_fever").unwrap()),
            },
            PhraseMatch {
                phrase: "xyz".into(),
                result: MatchResult::NoMatch,
            },
        ];
        let set = PresentSymptomSet::from_matches(&matches);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&SymptomName::new("high_fever").unwrap()));
    }
}
