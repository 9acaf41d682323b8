// File: src/fuzzy/matcher.rs
use crate::config::MatcherConfig;
use crate::core::types::{normalize, MatchResult, PhraseMatch, SymptomName, Suggestion};
use crate::core::vocabulary::SymptomVocabulary;
use crate::fuzzy::similarity::is_filler;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Maps free-text phrases onto vocabulary entries.
///
/// A phrase is tried, in order, as an exact entry, as a configured alias, as
/// a whole-token run inside (or around) an entry, and finally by similarity
/// score against every entry.
#[derive(Debug, Clone)]
pub struct SymptomMatcher {
    config: MatcherConfig,
    /// Normalized lay term -> normalized candidate entries.
    aliases: HashMap<String, Vec<String>>,
}

impl SymptomMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        let aliases = config
            .aliases
            .iter()
            .map(|(term, targets)| {
                (
                    normalize(term),
                    targets.iter().map(|t| normalize(t)).collect(),
                )
            })
            .collect();
        Self { config, aliases }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Matches one phrase at the configured threshold.
    pub fn match_phrase(&self, phrase: &str, vocabulary: &SymptomVocabulary) -> MatchResult {
        self.match_with_threshold(phrase, vocabulary, self.config.threshold)
    }

    pub fn match_with_threshold(
        &self,
        phrase: &str,
        vocabulary: &SymptomVocabulary,
        threshold: f64,
    ) -> MatchResult {
        let normalized = normalize(phrase);
        if normalized.is_empty() {
            return MatchResult::NoMatch;
        }

        if let Some(entry) = vocabulary.get(&normalized) {
            return MatchResult::Matched(entry.clone());
        }

        if let Some(entry) = self.resolve_alias(&normalized, vocabulary) {
            log::debug!("'{phrase}' resolved through alias to '{entry}'");
            return MatchResult::Matched(entry.clone());
        }

        if let Some(entry) = token_containment(&normalized, vocabulary) {
            log::debug!("'{phrase}' matched '{entry}' on whole tokens");
            return MatchResult::Matched(entry.clone());
        }

        self.score_against(&normalized, vocabulary, threshold)
    }

    /// Splits comma/semicolon separated input and matches each phrase
    /// independently. Every phrase gets an outcome, including misses.
    pub fn match_input(&self, text: &str, vocabulary: &SymptomVocabulary) -> Vec<PhraseMatch> {
        split_phrases(text)
            .into_iter()
            .map(|phrase| PhraseMatch {
                phrase: phrase.to_string(),
                result: self.match_phrase(phrase, vocabulary),
            })
            .collect()
    }

    /// Entries whose normalized form contains `partial`, in vocabulary order.
    pub fn suggest_prefix<'v>(
        &self,
        partial: &str,
        vocabulary: &'v SymptomVocabulary,
        limit: usize,
    ) -> Vec<&'v SymptomName> {
        let partial = normalize(partial);
        if partial.is_empty() {
            return Vec::new();
        }
        vocabulary
            .iter()
            .filter(|entry| entry.as_str().contains(&partial))
            .take(limit)
            .collect()
    }

    fn resolve_alias<'v>(
        &self,
        normalized: &str,
        vocabulary: &'v SymptomVocabulary,
    ) -> Option<&'v SymptomName> {
        self.aliases
            .get(normalized)?
            .iter()
            .find_map(|target| vocabulary.get(target))
    }

    fn score_against(
        &self,
        normalized: &str,
        vocabulary: &SymptomVocabulary,
        threshold: f64,
    ) -> MatchResult {
        let metric = self.config.metric;
        let scored: Vec<(&SymptomName, f64)> = vocabulary
            .iter()
            .map(|entry| (entry, metric.score(normalized, entry.as_str())))
            .collect();

        // First entry wins ties so the outcome follows vocabulary order.
        let best = scored.iter().fold(None, |best: Option<&(&SymptomName, f64)>, item| {
            match best {
                Some(b) if b.1 >= item.1 => Some(b),
                _ => Some(item),
            }
        });
        if let Some(&(entry, score)) = best {
            if score >= threshold {
                return MatchResult::Matched(entry.clone());
            }
        }

        let floor = threshold * self.config.suggestion_band;
        let mut near: Vec<(&SymptomName, f64)> =
            scored.into_iter().filter(|(_, s)| *s >= floor).collect();
        if near.is_empty() {
            return MatchResult::NoMatch;
        }
        near.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        MatchResult::Suggestions(
            near.into_iter()
                .take(self.config.max_suggestions)
                .map(|(entry, score)| Suggestion {
                    symptom: entry.clone(),
                    score,
                })
                .collect(),
        )
    }
}

/// Splits user input on commas and semicolons, dropping blank pieces.
pub fn split_phrases(text: &str) -> Vec<&str> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Whole-token containment in either direction.
///
/// Tokens are the `_`-separated words of the normalized forms and a match
/// needs a contiguous run of whole tokens, so "ache" never hits "headache".
/// An entry found inside the phrase wins (longest entry first); otherwise the
/// shortest entry containing the phrase is taken. Runs made only of filler
/// words are ignored.
fn token_containment<'v>(
    normalized: &str,
    vocabulary: &'v SymptomVocabulary,
) -> Option<&'v SymptomName> {
    let phrase: Vec<&str> = normalized.split('_').collect();

    let mut inside: Option<(&SymptomName, usize)> = None;
    let mut around: Option<(&SymptomName, usize)> = None;
    for entry in vocabulary.iter() {
        let tokens: Vec<&str> = entry.tokens().collect();
        if tokens.len() < phrase.len() {
            if contains_run(&phrase, &tokens) && inside.map_or(true, |(_, n)| tokens.len() > n) {
                inside = Some((entry, tokens.len()));
            }
        } else if tokens.len() > phrase.len()
            && contains_run(&tokens, &phrase)
            && around.map_or(true, |(_, n)| tokens.len() < n)
        {
            around = Some((entry, tokens.len()));
        }
    }
    inside.or(around).map(|(entry, _)| entry)
}

fn contains_run(haystack: &[&str], needle: &[&str]) -> bool {
    if needle.is_empty() || needle.iter().all(|t| is_filler(t)) {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
