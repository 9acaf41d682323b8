// src/lib.rs

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod fuzzy;
pub mod learning;
pub mod persistence;
pub mod report;

pub use crate::config::EngineConfig;
pub use crate::core::context::{Conversation, PatientProfile, Reply};
pub use crate::core::engine::{diagnose, Consultation, Diagnosis, DiagnosisService};
pub use crate::core::types::{MatchResult, Prediction, PresentSymptomSet, SymptomName};
pub use crate::error::{DxError, Result};
