// File: src/core/context.rs
//! Per-session conversation state.
//!
//! A `Conversation` owns everything one user session accumulates (profile,
//! transcript, last consultation) and borrows the shared, read-only
//! `DiagnosisService` only for the duration of a turn.

use crate::core::engine::{Consultation, DiagnosisService};
use crate::core::types::PhraseMatch;
use crate::persistence::{self, ConversationLog, Speaker};
use crate::report;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: String,
    pub gender: String,
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self {
            name: "Anonymous".to_string(),
            age: NOT_SPECIFIED.to_string(),
            gender: NOT_SPECIFIED.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Age,
    Gender,
}

impl ProfileField {
    fn prompt(self) -> &'static str {
        match self {
            ProfileField::Name => "What's your name? (press Enter to skip)",
            ProfileField::Age => "What's your age? (press Enter to skip)",
            ProfileField::Gender => "What's your gender? (press Enter to skip)",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            ProfileField::Name => Some(ProfileField::Age),
            ProfileField::Age => Some(ProfileField::Gender),
            ProfileField::Gender => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "field", rename_all = "snake_case")]
pub enum ConversationState {
    CollectingProfile(ProfileField),
    CollectingSymptoms,
    /// A report was shown; waiting for the "analyse more?" answer.
    Reporting,
    /// The session has ended. Only `clear` and `profile` revive it.
    Idle,
}

/// One unit of output for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Prompt { text: String },
    Notice { text: String },
    Help { text: String },
    SymptomList { text: String, symptoms: Vec<String> },
    Report { text: String, consultation: Consultation },
    NeedSymptoms { text: String, phrases: Vec<PhraseMatch> },
    Saved { path: PathBuf },
    Error { text: String },
    Farewell { text: String },
}

impl Reply {
    /// The human-readable text of the reply.
    pub fn text(&self) -> String {
        match self {
            Reply::Prompt { text }
            | Reply::Notice { text }
            | Reply::Help { text }
            | Reply::SymptomList { text, .. }
            | Reply::Report { text, .. }
            | Reply::NeedSymptoms { text, .. }
            | Reply::Error { text }
            | Reply::Farewell { text } => text.clone(),
            Reply::Saved { path } => format!("Conversation saved to {}", path.display()),
        }
    }

    fn prompt(text: &str) -> Self {
        Reply::Prompt {
            text: text.to_string(),
        }
    }
}

const SYMPTOM_PROMPT: &str =
    "Please describe your symptoms, separated by commas (type 'help' for guidance):";
const CONTINUE_PROMPT: &str = "Would you like to analyze more symptoms? (y/n)";
const FAREWELL: &str = "Take care! Remember to consult a healthcare professional.";

enum Command<'a> {
    Quit,
    Help,
    /// `true` lists the whole vocabulary instead of a preview.
    Symptoms(bool),
    Profile,
    Clear,
    Save(&'a str),
}

fn parse_command(input: &str) -> Option<Command<'_>> {
    let lower = input.to_lowercase();
    match lower.as_str() {
        "quit" | "exit" | "bye" => return Some(Command::Quit),
        "help" => return Some(Command::Help),
        "suggestions" => return Some(Command::Symptoms(false)),
        "symptoms" => return Some(Command::Symptoms(true)),
        "profile" => return Some(Command::Profile),
        "clear" => return Some(Command::Clear),
        _ => {}
    }
    let (head, rest) = input.split_once(char::is_whitespace)?;
    if head.eq_ignore_ascii_case("save") && !rest.trim().is_empty() {
        Some(Command::Save(rest.trim()))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    state: ConversationState,
    profile: PatientProfile,
    log: ConversationLog,
    last: Option<Consultation>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Starts by asking for the patient's name.
    pub fn new() -> Self {
        Self {
            state: ConversationState::CollectingProfile(ProfileField::Name),
            profile: PatientProfile::default(),
            log: ConversationLog::new(),
            last: None,
        }
    }

    /// Skips the profile questions.
    pub fn with_profile(profile: PatientProfile) -> Self {
        Self {
            state: ConversationState::CollectingSymptoms,
            profile,
            log: ConversationLog::new(),
            last: None,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn profile(&self) -> &PatientProfile {
        &self.profile
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn last_consultation(&self) -> Option<&Consultation> {
        self.last.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state == ConversationState::Idle
    }

    /// Greeting plus the prompt for the current state.
    pub fn opening(&mut self) -> Vec<Reply> {
        let replies = vec![
            Reply::Notice {
                text: report::WELCOME.to_string(),
            },
            self.current_prompt(),
        ];
        self.record(&replies);
        replies
    }

    /// Drops the transcript and the last consultation. The profile is kept.
    pub fn clear(&mut self) {
        self.log.clear();
        self.log.push(Speaker::System, "Chat cleared.");
        self.last = None;
        if !matches!(self.state, ConversationState::CollectingProfile(_)) {
            self.state = ConversationState::CollectingSymptoms;
        }
    }

    /// Processes one line of user input.
    pub fn handle(&mut self, service: &DiagnosisService, input: &str) -> Vec<Reply> {
        let input = input.trim();
        if !input.is_empty() {
            self.log.push(Speaker::User, input);
        }
        let replies = self.dispatch(service, input);
        self.record(&replies);
        replies
    }

    fn dispatch(&mut self, service: &DiagnosisService, input: &str) -> Vec<Reply> {
        if let ConversationState::CollectingProfile(field) = self.state {
            // Names are free text, so only the exit words act as commands here.
            if matches!(parse_command(input), Some(Command::Quit)) {
                return self.finish();
            }
            return self.fill_profile(field, input);
        }

        if let Some(command) = parse_command(input) {
            return self.run_command(service, command);
        }

        match self.state {
            ConversationState::Reporting => {
                if matches!(input.to_lowercase().as_str(), "y" | "yes") {
                    self.state = ConversationState::CollectingSymptoms;
                    vec![Reply::prompt(SYMPTOM_PROMPT)]
                } else {
                    self.finish()
                }
            }
            ConversationState::Idle => vec![Reply::Notice {
                text: "The session has ended. Type 'clear' to start over.".to_string(),
            }],
            _ if input.is_empty() => vec![Reply::prompt("Please enter at least one symptom.")],
            _ => self.consult(service, input),
        }
    }

    fn fill_profile(&mut self, field: ProfileField, input: &str) -> Vec<Reply> {
        let value = if input.is_empty() {
            None
        } else {
            Some(input.to_string())
        };
        let defaults = PatientProfile::default();
        match field {
            ProfileField::Name => self.profile.name = value.unwrap_or(defaults.name),
            ProfileField::Age => self.profile.age = value.unwrap_or(defaults.age),
            ProfileField::Gender => self.profile.gender = value.unwrap_or(defaults.gender),
        }
        match field.next() {
            Some(next) => {
                self.state = ConversationState::CollectingProfile(next);
                vec![Reply::prompt(next.prompt())]
            }
            None => {
                self.state = ConversationState::CollectingSymptoms;
                vec![
                    Reply::Notice {
                        text: format!("Thank you, {}.", self.profile.name),
                    },
                    Reply::prompt(SYMPTOM_PROMPT),
                ]
            }
        }
    }

    fn run_command(&mut self, service: &DiagnosisService, command: Command<'_>) -> Vec<Reply> {
        match command {
            Command::Quit => self.finish(),
            Command::Help => vec![Reply::Help {
                text: report::HELP.to_string(),
            }],
            Command::Symptoms(show_all) => {
                let known = service.known_symptoms();
                vec![Reply::SymptomList {
                    text: report::render_symptom_list(&known, show_all),
                    symptoms: known.into_iter().map(str::to_string).collect(),
                }]
            }
            Command::Profile => {
                self.profile = PatientProfile::default();
                self.state = ConversationState::CollectingProfile(ProfileField::Name);
                vec![Reply::prompt(ProfileField::Name.prompt())]
            }
            Command::Clear => {
                self.clear();
                vec![
                    Reply::Notice {
                        text: "Conversation cleared. Your profile is kept.".to_string(),
                    },
                    Reply::prompt(SYMPTOM_PROMPT),
                ]
            }
            Command::Save(path) => {
                let path = PathBuf::from(path);
                match persistence::save_to_disk(&self.log, &path) {
                    Ok(()) => {
                        log::info!("Conversation saved to {}", path.display());
                        vec![Reply::Saved { path }]
                    }
                    Err(e) => {
                        log::warn!("Could not save conversation: {e}");
                        vec![Reply::Error {
                            text: format!("Could not save conversation: {e}"),
                        }]
                    }
                }
            }
        }
    }

    fn consult(&mut self, service: &DiagnosisService, input: &str) -> Vec<Reply> {
        let consultation = match service.consult(input) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Diagnosis failed: {e}");
                return vec![
                    Reply::Error {
                        text: format!("Error during diagnosis: {e}"),
                    },
                    Reply::prompt(SYMPTOM_PROMPT),
                ];
            }
        };

        let Some(diagnosis) = &consultation.diagnosis else {
            let mut text = String::from("I couldn't recognise any of those symptoms.\n");
            text.push_str(&report::render_notices(&consultation.phrases));
            text.push_str("Type 'suggestions' to see the symptoms I know.");
            return vec![Reply::NeedSymptoms {
                text,
                phrases: consultation.phrases.clone(),
            }];
        };

        let text = report::render_report(
            &self.profile,
            &consultation,
            diagnosis,
            service.vocabulary(),
            Local::now(),
        );
        self.last = Some(consultation.clone());
        self.state = ConversationState::Reporting;
        vec![
            Reply::Report { text, consultation },
            Reply::prompt(CONTINUE_PROMPT),
        ]
    }

    fn finish(&mut self) -> Vec<Reply> {
        self.state = ConversationState::Idle;
        vec![Reply::Farewell {
            text: FAREWELL.to_string(),
        }]
    }

    fn current_prompt(&self) -> Reply {
        match self.state {
            ConversationState::CollectingProfile(field) => Reply::prompt(field.prompt()),
            ConversationState::Reporting => Reply::prompt(CONTINUE_PROMPT),
            _ => Reply::prompt(SYMPTOM_PROMPT),
        }
    }

    fn record(&mut self, replies: &[Reply]) {
        for reply in replies {
            self.log.push(Speaker::Assistant, reply.text());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::treatment::TreatmentBook;
    use crate::core::types::TrainingRow;
    use crate::core::vocabulary::SymptomVocabulary;
    use crate::dataset::TrainingTable;
    use std::path::Path;
    use tempfile::TempDir;

    fn service() -> DiagnosisService {
        let path = Path::new("Training.csv");
        let vocabulary =
            SymptomVocabulary::build(path, &["fever", "cough", "headache"]).unwrap();
        let mut rows = Vec::new();
        for _ in 0..10 {
            rows.push(TrainingRow {
                features: vec![true, true, false],
                label: "Flu".to_string(),
            });
        }
        for _ in 0..8 {
            rows.push(TrainingRow {
                features: vec![false, true, false],
                label: "Cold".to_string(),
            });
        }
        let table = TrainingTable {
            source: path.to_path_buf(),
            vocabulary,
            rows,
        };
        let treatments =
            TreatmentBook::from_entries(vec![("Flu".to_string(), "Rest and fluids".to_string())]);
        DiagnosisService::from_parts(table, treatments, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn profile_questions_fill_defaults() {
        let svc = service();
        let mut conv = Conversation::new();
        assert_eq!(conv.opening().len(), 2);
        conv.handle(&svc, "Asha");
        conv.handle(&svc, "");
        let replies = conv.handle(&svc, "female");
        assert_eq!(conv.state(), ConversationState::CollectingSymptoms);
        assert_eq!(conv.profile().name, "Asha");
        assert_eq!(conv.profile().age, "Not specified");
        assert!(matches!(replies.last(), Some(Reply::Prompt { .. })));
    }

    #[test]
    fn symptoms_produce_report_then_continue_prompt() {
        let svc = service();
        let mut conv = Conversation::with_profile(PatientProfile::default());
        let replies = conv.handle(&svc, "fever, cough");
        assert_eq!(conv.state(), ConversationState::Reporting);
        let Reply::Report { text, consultation } = &replies[0] else {
            panic!("expected a report, got {replies:?}");
        };
        assert!(text.contains("DISCLAIMER"));
        assert!(text.contains("Rest and fluids"));
        let top = consultation.diagnosis.as_ref().unwrap().prediction.top().unwrap();
        assert_eq!(top.disease, "Flu");

        conv.handle(&svc, "yes");
        assert_eq!(conv.state(), ConversationState::CollectingSymptoms);
        conv.handle(&svc, "fever");
        let replies = conv.handle(&svc, "n");
        assert!(conv.is_finished());
        assert!(matches!(replies[0], Reply::Farewell { .. }));
    }

    #[test]
    fn unrecognised_input_asks_again() {
        let svc = service();
        let mut conv = Conversation::with_profile(PatientProfile::default());
        let replies = conv.handle(&svc, "xyz123");
        let Reply::NeedSymptoms { text, phrases } = &replies[0] else {
            panic!("expected NeedSymptoms, got {replies:?}");
        };
        assert!(text.contains("'xyz123'"));
        assert_eq!(phrases.len(), 1);
        assert_eq!(conv.state(), ConversationState::CollectingSymptoms);
        assert!(conv.last_consultation().is_none());
    }

    #[test]
    fn empty_symptom_line_prompts() {
        let svc = service();
        let mut conv = Conversation::with_profile(PatientProfile::default());
        let replies = conv.handle(&svc, "   ");
        assert!(matches!(&replies[0], Reply::Prompt { text } if text.contains("at least one")));
    }

    #[test]
    fn commands_are_case_insensitive() {
        let svc = service();
        let mut conv = Conversation::with_profile(PatientProfile::default());
        let replies = conv.handle(&svc, "Symptoms");
        let Reply::SymptomList { symptoms, .. } = &replies[0] else {
            panic!("expected a symptom list");
        };
        assert_eq!(symptoms, &["fever", "cough", "headache"]);
        assert!(matches!(conv.handle(&svc, "HELP")[0], Reply::Help { .. }));
        assert!(matches!(conv.handle(&svc, "Bye")[0], Reply::Farewell { .. }));
    }

    #[test]
    fn symptoms_lists_everything_and_suggestions_previews() {
        assert!(matches!(parse_command("symptoms"), Some(Command::Symptoms(true))));
        assert!(matches!(parse_command("Suggestions"), Some(Command::Symptoms(false))));
        assert!(parse_command("save").is_none());
        assert!(matches!(parse_command("save  out.json"), Some(Command::Save("out.json"))));
    }

    #[test]
    fn quit_during_profile_ends_session() {
        let svc = service();
        let mut conv = Conversation::new();
        conv.handle(&svc, "exit");
        assert!(conv.is_finished());
    }

    #[test]
    fn clear_restarts_an_ended_session() {
        let svc = service();
        let mut conv = Conversation::with_profile(PatientProfile::default());
        conv.handle(&svc, "fever");
        conv.handle(&svc, "quit");
        assert!(conv.is_finished());
        conv.handle(&svc, "clear");
        assert_eq!(conv.state(), ConversationState::CollectingSymptoms);
        assert!(conv.last_consultation().is_none());
        // Only the clear marker and the replies to "clear" remain.
        assert_eq!(conv.log().len(), 3);
        assert_eq!(conv.log().entries()[0].speaker, Speaker::System);
    }

    #[test]
    fn save_writes_the_transcript() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");
        let mut conv = Conversation::with_profile(PatientProfile::default());
        conv.handle(&svc, "cough");
        let replies = conv.handle(&svc, &format!("save {}", path.display()));
        assert!(matches!(&replies[0], Reply::Saved { path: p } if p == &path));
        let saved = persistence::load_from_disk(&path).unwrap();
        assert_eq!(saved.entries()[0].content, "cough");
    }

    #[test]
    fn replies_serialize_with_type_tag() {
        let json = serde_json::to_value(Reply::prompt("hi")).unwrap();
        assert_eq!(json["type"], "prompt");
        assert_eq!(json["text"], "hi");
    }
}
