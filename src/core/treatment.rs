// src/core/treatment.rs
use std::collections::HashMap;

/// Shown when no treatment text is stored for a predicted disease.
pub const FALLBACK_TREATMENT: &str =
    "Consult a healthcare provider for proper diagnosis and treatment.";

/// Disease name -> stored treatment guidance. Keys are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TreatmentBook {
    entries: HashMap<String, String>,
}

impl TreatmentBook {
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (key(k.as_ref()), v.into()))
            .filter(|(k, v)| !k.is_empty() && !v.trim().is_empty())
            .collect();
        Self { entries }
    }

    /// Stored text for `disease`, or the generic fallback. Never fails.
    pub fn lookup(&self, disease: &str) -> &str {
        self.entries
            .get(&key(disease))
            .map(String::as_str)
            .unwrap_or(FALLBACK_TREATMENT)
    }

    pub fn contains(&self, disease: &str) -> bool {
        self.entries.contains_key(&key(disease))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(disease: &str) -> String {
    disease.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let book = TreatmentBook::from_entries([(" Common Cold ", "Rest and fluids.")]);
        assert_eq!(book.lookup("common cold"), "Rest and fluids.");
        assert_eq!(book.lookup("COMMON COLD"), "Rest and fluids.");
        assert!(book.contains("Common Cold"));
    }

    #[test]
    fn missing_or_blank_entries_fall_back() {
        let book = TreatmentBook::from_entries([("Malaria", "  "), ("", "orphan")]);
        assert!(book.is_empty());
        assert_eq!(book.lookup("Malaria"), FALLBACK_TREATMENT);
        assert_eq!(book.lookup("Unknown"), FALLBACK_TREATMENT);
    }
}
