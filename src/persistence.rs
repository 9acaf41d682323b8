// File: src/persistence.rs
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

/// Timestamped transcript of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationLog {
    entries: Vec<LogEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, speaker: Speaker, content: impl Into<String>) {
        self.entries.push(LogEntry {
            speaker,
            content: content.into(),
            timestamp: Local::now(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Writes the log as pretty JSON. The file is written to a temp file in the
/// same directory and renamed into place, so readers never see a partial file.
pub fn save_to_disk(log: &ConversationLog, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        serde_json::to_writer_pretty(&mut writer, log)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn load_from_disk(path: &Path) -> Result<ConversationLog> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_preserves_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut log = ConversationLog::new();
        log.push(Speaker::User, "fever, cough");
        log.push(Speaker::Assistant, "Top prediction: Flu");
        save_to_disk(&log, &path).unwrap();

        let loaded = load_from_disk(&path).unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded.entries()[0].speaker, Speaker::User);
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "stale").unwrap();

        let mut log = ConversationLog::new();
        log.push(Speaker::System, "Chat cleared.");
        save_to_disk(&log, &path).unwrap();
        assert_eq!(load_from_disk(&path).unwrap().len(), 1);
    }
}
