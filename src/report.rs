// File: src/report.rs
//! Plain-text rendering shared by the terminal chat and the GUI bridge.

use crate::core::context::PatientProfile;
use crate::core::engine::{Consultation, Diagnosis};
use crate::core::types::{MatchResult, PhraseMatch};
use crate::core::vocabulary::SymptomVocabulary;
use chrono::{DateTime, Local};
use std::fmt::Write;

pub const DISCLAIMER: &str = "\
IMPORTANT MEDICAL DISCLAIMER
This assistant is for informational purposes only and should NOT replace
professional medical advice, diagnosis, or treatment. Always consult a
qualified healthcare provider for any medical concerns.";

pub const WELCOME: &str = "\
Welcome to the Medical Diagnosis Assistant.
I can analyse your symptoms and offer a preliminary, educational guess.
Let's start with some basic information about you.";

/// Lay terms offered to users who don't know the vocabulary.
pub const COMMON_SYMPTOMS: &[&str] = &[
    "fever", "headache", "nausea", "vomiting", "cough", "sneezing", "rash", "fatigue",
    "weakness", "pain", "breathing", "dizziness", "anxiety", "depression", "constipation",
    "diarrhea", "sweating", "trembling", "cold", "itching", "swelling",
];

/// How many vocabulary entries the short symptom list shows.
pub const SYMPTOM_PREVIEW: usize = 15;

const RULE: &str = "============================================================";

pub const HELP: &str = "\
HOW TO USE:
  - Enter your symptoms separated by commas (e.g. \"fever, headache, nausea\")
  - 'suggestions' lists the symptoms the assistant knows
  - 'profile' re-enters your name, age and gender
  - 'clear' clears the conversation
  - 'save <file>' writes the conversation to a JSON file
  - 'quit' ends the session

Remember: this is for educational purposes only!";

pub fn render_report(
    profile: &PatientProfile,
    consultation: &Consultation,
    diagnosis: &Diagnosis,
    vocabulary: &SymptomVocabulary,
    now: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nMEDICAL DIAGNOSIS REPORT\n{RULE}");
    let _ = writeln!(out, "Patient: {}", profile.name);
    let _ = writeln!(out, "Age: {}", profile.age);
    let _ = writeln!(out, "Gender: {}", profile.gender);
    let _ = writeln!(out, "Date: {}", now.format("%Y-%m-%d %H:%M:%S"));

    let reported: Vec<&str> = diagnosis
        .symptoms
        .iter()
        .map(|s| vocabulary.display_name(s).unwrap_or(s.as_str()))
        .collect();
    let _ = writeln!(out, "\nReported symptoms:\n   {}", reported.join(", "));

    if consultation.has_notices() {
        let _ = writeln!(out, "\nUnrecognized symptoms (ignored):");
        out.push_str(&render_notices(consultation.unmatched()));
    }

    let _ = writeln!(out, "\nDIAGNOSIS RESULTS:");
    for (rank, ranked) in diagnosis.prediction.iter().enumerate() {
        let _ = writeln!(
            out,
            "   {}. {} ({:.1}% confidence)",
            rank + 1,
            ranked.disease,
            ranked.confidence * 100.0
        );
    }
    let _ = writeln!(out, "\nTREATMENT SUGGESTION:\n   {}", diagnosis.treatment);
    let _ = writeln!(out, "\n{DISCLAIMER}\n{RULE}");
    out
}

/// One line per unmatched phrase, listing near misses when there are any.
pub fn render_notices<'a>(phrases: impl IntoIterator<Item = &'a PhraseMatch>) -> String {
    let mut out = String::new();
    for phrase in phrases {
        match &phrase.result {
            MatchResult::Suggestions(list) => {
                let names: Vec<&str> = list.iter().map(|s| s.symptom.as_str()).collect();
                let _ = writeln!(
                    out,
                    "   '{}' - did you mean: {}?",
                    phrase.phrase,
                    names.join(", ")
                );
            }
            MatchResult::NoMatch => {
                let _ = writeln!(out, "   '{}' - not recognised", phrase.phrase);
            }
            MatchResult::Matched(_) => {}
        }
    }
    out
}

pub fn render_symptom_list(known: &[&str], show_all: bool) -> String {
    let mut out = String::from("Common symptoms you can try:\n");
    for (i, symptom) in COMMON_SYMPTOMS.iter().enumerate() {
        let _ = writeln!(out, "   {:2}. {symptom}", i + 1);
    }
    let shown = if show_all {
        known.len()
    } else {
        known.len().min(SYMPTOM_PREVIEW)
    };
    let _ = writeln!(out, "\nKnown symptoms ({}):", known.len());
    for (i, symptom) in known.iter().take(shown).enumerate() {
        let _ = writeln!(out, "   {:3}. {symptom}", i + 1);
    }
    if shown < known.len() {
        let _ = writeln!(out, "   ... and {} more", known.len() - shown);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Suggestion, SymptomName};

    fn phrase(text: &str, result: MatchResult) -> PhraseMatch {
        PhraseMatch {
            phrase: text.to_string(),
            result,
        }
    }

    #[test]
    fn notices_cover_every_unmatched_phrase() {
        let phrases = vec![
            phrase("fever", MatchResult::Matched(SymptomName::new("fever").unwrap())),
            phrase(
                "coug",
                MatchResult::Suggestions(vec![Suggestion {
                    symptom: SymptomName::new("cough").unwrap(),
                    score: 0.8,
                }]),
            ),
            phrase("xyz123", MatchResult::NoMatch),
        ];
        let text = render_notices(&phrases);
        assert!(!text.contains("'fever'"));
        assert!(text.contains("'coug' - did you mean: cough?"));
        assert!(text.contains("'xyz123' - not recognised"));
    }

    #[test]
    fn symptom_list_preview_is_truncated() {
        let known: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
        let known: Vec<&str> = known.iter().map(String::as_str).collect();
        let short = render_symptom_list(&known, false);
        assert!(short.contains("... and 5 more"));
        assert!(!short.contains("s15"));
        let full = render_symptom_list(&known, true);
        assert!(full.contains("s19"));
        assert!(!full.contains("more"));
    }
}
