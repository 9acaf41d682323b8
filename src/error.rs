// File: src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the assistant can report, from startup through a single turn.
#[derive(Error, Debug)]
pub enum DxError {
    /// A training or treatment file could not be read, decoded or parsed.
    #[error("data error in {}: {message}", path.display())]
    Data { path: PathBuf, message: String },

    /// Fewer than two disease classes survived the sample-count filter.
    #[error("insufficient training data: {classes} eligible disease class(es), need at least 2")]
    InsufficientData { classes: usize },

    /// A diagnosis was requested without a single confirmed symptom.
    #[error("no recognised symptoms to analyse")]
    EmptyInput,

    #[error("symptom '{0}' is not part of the vocabulary")]
    UnknownSymptom(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DxError {
    pub fn data(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Data {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Startup errors stop the process; everything else is recovered per turn.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Data { .. } | Self::InsufficientData { .. } | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_errors_are_fatal() {
        assert!(DxError::data("Training.csv", "bad row").is_fatal());
        assert!(DxError::InsufficientData { classes: 1 }.is_fatal());
        assert!(DxError::Config("threshold".into()).is_fatal());
        assert!(!DxError::EmptyInput.is_fatal());
        assert!(!DxError::UnknownSymptom("x".into()).is_fatal());
    }

    #[test]
    fn data_error_names_the_file() {
        let err = DxError::data("data/Training.csv", "missing column");
        assert!(err.to_string().contains("data/Training.csv"));
    }
}
