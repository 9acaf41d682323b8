// --- File: src/core/vocabulary.rs
use crate::core::types::SymptomName;
use crate::error::{DxError, Result};
use std::collections::HashMap;
use std::path::Path;

/// The frozen, ordered set of symptoms a model was trained on.
///
/// Position in the vocabulary is the feature index, so every feature vector
/// built against it has the same width and column order.
#[derive(Debug, Clone)]
pub struct SymptomVocabulary {
    entries: Vec<SymptomName>,
    display: Vec<String>,
    index: HashMap<SymptomName, usize>,
}

impl SymptomVocabulary {
    /// Builds the vocabulary from raw column headers.
    ///
    /// Two headers that normalize to the same name are rejected rather than
    /// silently merged, since that would fold two feature columns into one.
    pub fn build<S: AsRef<str>>(source: &Path, columns: &[S]) -> Result<Self> {
        let mut entries = Vec::with_capacity(columns.len());
        let mut display = Vec::with_capacity(columns.len());
        let mut index = HashMap::with_capacity(columns.len());

        for raw in columns {
            let raw = raw.as_ref();
            let name = SymptomName::new(raw).ok_or_else(|| {
                DxError::data(source, format!("symptom column '{raw}' has no usable name"))
            })?;
            if let Some(&first) = index.get(&name) {
                return Err(DxError::data(
                    source,
                    format!(
                        "columns '{}' and '{raw}' both normalize to '{name}'",
                        display[first]
                    ),
                ));
            }
            index.insert(name.clone(), entries.len());
            entries.push(name);
            display.push(raw.trim().to_string());
        }

        Ok(Self {
            entries,
            display,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &SymptomName) -> bool {
        self.index.contains_key(name)
    }

    /// Feature index of `name`.
    pub fn position(&self, name: &SymptomName) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Looks up a vocabulary entry by its normalized string form.
    pub fn get(&self, normalized: &str) -> Option<&SymptomName> {
        self.index.get_key_value(normalized).map(|(name, _)| name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymptomName> {
        self.entries.iter()
    }

    /// The header text the symptom was read from, for presentation.
    pub fn display_name(&self, name: &SymptomName) -> Option<&str> {
        self.position(name).map(|i| self.display[i].as_str())
    }

    /// All symptoms in display form, in feature order.
    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.display.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("Training.csv")
    }

    #[test]
    fn build_keeps_column_order() {
        let vocab =
            SymptomVocabulary::build(path(), &["Itching", "skin_rash", "High Fever"]).unwrap();
        let names: Vec<_> = vocab.iter().map(SymptomName::as_str).collect();
        assert_eq!(names, vec!["itching", "skin_rash", "high_fever"]);
        assert_eq!(vocab.len(), 3);

        let again =
            SymptomVocabulary::build(path(), &["Itching", "skin_rash", "High Fever"]).unwrap();
        assert!(vocab.iter().eq(again.iter()));
    }

    #[test]
    fn reverse_lookup_returns_display_form() {
        let vocab = SymptomVocabulary::build(path(), &[" High Fever ", "cough"]).unwrap();
        let fever = SymptomName::new("high_fever").unwrap();
        assert!(vocab.contains(&fever));
        assert_eq!(vocab.position(&fever), Some(0));
        assert_eq!(vocab.display_name(&fever), Some("High Fever"));
        assert_eq!(vocab.get("cough").map(SymptomName::as_str), Some("cough"));
    }

    #[test]
    fn colliding_columns_are_rejected() {
        let err = SymptomVocabulary::build(path(), &["skin rash", "Skin_Rash"]).unwrap_err();
        assert!(matches!(err, DxError::Data { .. }));
        assert!(err.to_string().contains("skin_rash"));
    }

    #[test]
    fn unnamed_column_is_rejected() {
        assert!(SymptomVocabulary::build(path(), &["cough", "--"]).is_err());
    }
}
