// File: src/dataset.rs
//! Reading the training and treatment tables from disk.
//!
//! Source files come in whatever encoding the spreadsheet tool saved them
//! in, so every file is sniffed before it is parsed.

use crate::core::treatment::TreatmentBook;
use crate::core::types::{normalize, TrainingRow};
use crate::core::vocabulary::SymptomVocabulary;
use crate::error::{DxError, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes handed to the encoding detector.
const SNIFF_LIMIT: usize = 100_000;

/// The parsed training table: the vocabulary its columns define and one row per case.
#[derive(Debug, Clone)]
pub struct TrainingTable {
    pub source: PathBuf,
    pub vocabulary: SymptomVocabulary,
    pub rows: Vec<TrainingRow>,
}

/// Reads `path` and decodes it, trying BOM, detected encoding, UTF-8 and
/// windows-1252 in that order.
///
/// windows-1252 maps every byte (undefined ones to C1 controls), so it is
/// the last resort and a file only fails here when it cannot be read.
pub fn read_text_auto(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).map_err(|e| DxError::data(path, format!("cannot read file: {e}")))?;

    if let Some((encoding, bom_len)) = Encoding::for_bom(&bytes) {
        if let Some(text) = try_decode(path, encoding, &bytes[bom_len..]) {
            return Ok(text);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(&bytes[..bytes.len().min(SNIFF_LIMIT)], true);
    let detected = detector.guess(None, true);
    log::info!("Detected encoding for {}: {}", path.display(), detected.name());

    for encoding in [detected, UTF_8, WINDOWS_1252] {
        if let Some(text) = try_decode(path, encoding, &bytes) {
            return Ok(text);
        }
    }
    Err(DxError::data(
        path,
        "unable to decode with any of the tried encodings",
    ))
}

fn try_decode(path: &Path, encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        log::debug!("Decoding {} as {} failed", path.display(), encoding.name());
        None
    } else {
        log::info!("Loaded {} with encoding {}", path.display(), encoding.name());
        Some(text.into_owned())
    }
}

fn csv_reader(text: &str, flexible: bool) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(flexible)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn parse_flag(cell: &str) -> Option<bool> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(false);
    }
    cell.parse::<f64>().ok().map(|v| v != 0.0)
}

/// Loads the symptom-occurrence table.
///
/// `label_column` holds the disease; every other column with a non-empty
/// header is a symptom flag. Empty cells count as absent.
pub fn load_training_table(path: &Path, label_column: &str) -> Result<TrainingTable> {
    let text = read_text_auto(path)?;
    let mut reader = csv_reader(&text, false);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DxError::data(path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let wanted = normalize(label_column);
    let label_idx = headers
        .iter()
        .position(|h| normalize(h) == wanted)
        .ok_or_else(|| {
            DxError::data(path, format!("the table must contain a '{label_column}' column"))
        })?;

    let mut symptom_cols = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        if i == label_idx {
            continue;
        }
        if header.trim().is_empty() {
            log::warn!("Skipping unnamed column {} in {}", i + 1, path.display());
            continue;
        }
        symptom_cols.push(i);
    }
    let names: Vec<&str> = symptom_cols.iter().map(|&i| headers[i].as_str()).collect();
    let vocabulary = SymptomVocabulary::build(path, &names)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DxError::data(path, e.to_string()))?;
        let line = record.position().map_or(0, |p| p.line());
        let label = record.get(label_idx).unwrap_or("").trim();
        if label.is_empty() {
            log::warn!("Skipping line {line} of {}: empty label", path.display());
            continue;
        }

        let mut features = Vec::with_capacity(symptom_cols.len());
        for &col in &symptom_cols {
            let cell = record.get(col).unwrap_or("");
            let flag = parse_flag(cell).ok_or_else(|| {
                DxError::data(
                    path,
                    format!("line {line}, column '{}': '{cell}' is not a number", headers[col]),
                )
            })?;
            features.push(flag);
        }
        rows.push(TrainingRow {
            features,
            label: label.to_string(),
        });
    }

    if rows.is_empty() {
        return Err(DxError::data(path, "the table has no usable rows"));
    }
    log::info!(
        "Training data loaded: {} samples, {} symptoms",
        rows.len(),
        vocabulary.len()
    );
    Ok(TrainingTable {
        source: path.to_path_buf(),
        vocabulary,
        rows,
    })
}

/// Loads the disease -> treatment table.
///
/// The key column is `Name`, or `Code` when there is no `Name` column;
/// treatment text comes from `Treatments`.
pub fn load_treatment_table(path: &Path) -> Result<TreatmentBook> {
    let text = read_text_auto(path)?;
    let mut reader = csv_reader(&text, true);
    let headers = reader
        .headers()
        .map_err(|e| DxError::data(path, e.to_string()))?
        .clone();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let key_idx = find("Name")
        .or_else(|| find("Code"))
        .ok_or_else(|| DxError::data(path, "the table must contain 'Code' or 'Name'"))?;
    let treatment_idx = find("Treatments")
        .ok_or_else(|| DxError::data(path, "the table must contain a 'Treatments' column"))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DxError::data(path, e.to_string()))?;
        let name = record.get(key_idx).unwrap_or("");
        let treatment = record.get(treatment_idx).unwrap_or("");
        if name.eq_ignore_ascii_case("nan") || treatment.eq_ignore_ascii_case("nan") {
            continue;
        }
        entries.push((name.to_string(), treatment.to_string()));
    }

    let book = TreatmentBook::from_entries(entries);
    log::info!("Treatment data loaded: {} diseases", book.len());
    Ok(book)
}
