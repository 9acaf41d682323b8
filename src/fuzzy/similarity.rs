// File: src/fuzzy/similarity.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Words that never anchor a match on their own.
const FILLER_TOKENS: &[&str] = &[
    "a", "after", "an", "and", "at", "behind", "for", "from", "have", "i", "in", "is", "my",
    "of", "on", "over", "the", "to", "with",
];

pub fn is_filler(token: &str) -> bool {
    FILLER_TOKENS.contains(&token)
}

/// How a phrase is scored against a vocabulary entry. All scores are in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// `1 - levenshtein / max_len` over the normalized strings.
    Levenshtein,
    /// Token-set ratio: order-insensitive, tolerant of extra words on one side.
    TokenSet,
    /// The higher of the two.
    #[default]
    Best,
}

impl SimilarityMetric {
    /// Scores two normalized (`_`-separated) strings.
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::Levenshtein => edit_ratio(a, b),
            Self::TokenSet => token_set_ratio(a, b),
            Self::Best => edit_ratio(a, b).max(token_set_ratio(a, b)),
        }
    }
}

fn edit_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Compares the shared tokens against each side's full token set, so
/// "pain_chest" and "chest_pain" score 1.0 and a stray extra word costs little.
/// Shared tokens that are all filler earn no credit; only the plain
/// cross comparison counts then.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split('_').filter(|t| !t.is_empty()).collect();
    let right: BTreeSet<&str> = b.split('_').filter(|t| !t.is_empty()).collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared: Vec<&str> = left.intersection(&right).copied().collect();
    let only_left: Vec<&str> = left.difference(&right).copied().collect();
    let only_right: Vec<&str> = right.difference(&left).copied().collect();

    let joined = |extra: &[&str]| -> String {
        shared
            .iter()
            .chain(extra.iter())
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    };
    let full_left = joined(&only_left);
    let full_right = joined(&only_right);

    let cross = edit_ratio(&full_left, &full_right);
    if shared.iter().all(|t| is_filler(t)) {
        return cross;
    }
    let core = shared.join("_");
    edit_ratio(&core, &full_left)
        .max(edit_ratio(&core, &full_right))
        .max(cross)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misspelling_scores_high() {
        let s = SimilarityMetric::Levenshtein.score("hedache", "headache");
        assert!((s - 0.875).abs() < 1e-9);
    }

    #[test]
    fn reordered_tokens_are_identical_for_token_set() {
        assert_eq!(token_set_ratio("pain_chest", "chest_pain"), 1.0);
        assert!(SimilarityMetric::Levenshtein.score("pain_chest", "chest_pain") < 1.0);
        assert_eq!(SimilarityMetric::Best.score("pain_chest", "chest_pain"), 1.0);
    }

    #[test]
    fn unrelated_strings_score_zero() {
        assert_eq!(SimilarityMetric::Best.score("xyz123", "high_fever"), 0.0);
        assert_eq!(SimilarityMetric::Best.score("", "cough"), 0.0);
    }

    #[test]
    fn filler_overlap_earns_no_token_credit() {
        assert!(token_set_ratio("and", "cold_hands_and_feets") < 0.3);
        assert!(token_set_ratio("of", "loss_of_appetite") < 0.3);
        assert!(token_set_ratio("behind_the", "pain_behind_the_eyes") < 0.6);
        assert_eq!(token_set_ratio("eyes_pain", "pain_behind_the_eyes"), 1.0);
    }

    #[test]
    fn scores_stay_in_unit_range() {
        for (a, b) in [("a", "ab"), ("joint_pain", "pain"), ("x_y_z", "z_y")] {
            for metric in [
                SimilarityMetric::Levenshtein,
                SimilarityMetric::TokenSet,
                SimilarityMetric::Best,
            ] {
                let s = metric.score(a, b);
                assert!((0.0..=1.0).contains(&s), "{metric:?} {a} {b} -> {s}");
            }
        }
    }
}
