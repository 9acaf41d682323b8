//! Engine configuration.
//!
//! Every tunable lives here and can be overridden from a TOML file; any
//! section or key left out falls back to its default.
//!
//! ```toml
//! [data]
//! training_csv = "data/Training.csv"
//!
//! [matcher]
//! threshold = 0.7
//!
//! [matcher.aliases]
//! tummy_ache = ["stomach_pain"]
//!
//! [forest]
//! n_trees = 50
//! ```

use crate::error::{DxError, Result};
use crate::fuzzy::similarity::SimilarityMetric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file when none is passed on the command line.
pub const CONFIG_ENV: &str = "DX_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data: DataConfig,
    pub matcher: MatcherConfig,
    pub trainer: TrainerConfig,
    pub forest: ForestParams,
    pub diagnosis: DiagnosisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub training_csv: PathBuf,
    pub treatments_csv: PathBuf,
    /// Column holding the disease label; every other column is a symptom.
    pub label_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            training_csv: PathBuf::from("Training.csv"),
            treatments_csv: PathBuf::from("Diseases_Symptoms.csv"),
            label_column: "prognosis".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum similarity for a fuzzy match to be accepted outright.
    pub threshold: f64,
    /// Lower edge of the suggestion band, as a fraction of `threshold`.
    pub suggestion_band: f64,
    pub max_suggestions: usize,
    pub metric: SimilarityMetric,
    /// Lay terms mapped to candidate vocabulary entries, tried in order.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            suggestion_band: 0.7,
            max_suggestions: 5,
            metric: SimilarityMetric::default(),
            aliases: default_aliases(),
        }
    }
}

const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("fever", &["high_fever", "mild_fever"]),
    ("cold", &["cold_hands_and_feets"]),
    ("diarrhea", &["diarrhoea"]),
    ("sneezing", &["continuous_sneezing"]),
    ("rash", &["skin_rash"]),
    ("weakness", &["muscle_weakness", "weakness_in_limbs"]),
    ("pain", &["joint_pain", "stomach_pain", "back_pain", "chest_pain"]),
    ("breathing", &["breathlessness"]),
];

fn default_aliases() -> BTreeMap<String, Vec<String>> {
    DEFAULT_ALIASES
        .iter()
        .map(|(term, targets)| {
            (
                term.to_string(),
                targets.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Labels seen fewer times than this are dropped with all their rows.
    pub min_samples_per_class: usize,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_samples_per_class: 2,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Number of candidate features drawn at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    All,
    #[serde(untagged)]
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::All => n_features,
            Self::Count(k) => k.min(n_features),
        };
        n.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub top_k: usize,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| DxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DxError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `explicit` if given, else the file named by `DX_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let m = &self.matcher;
        if !(m.threshold > 0.0 && m.threshold <= 1.0) {
            return Err(DxError::Config(format!(
                "matcher.threshold must be in (0, 1], got {}",
                m.threshold
            )));
        }
        if !(m.suggestion_band > 0.0 && m.suggestion_band <= 1.0) {
            return Err(DxError::Config(format!(
                "matcher.suggestion_band must be in (0, 1], got {}",
                m.suggestion_band
            )));
        }
        let t = &self.trainer;
        if t.min_samples_per_class == 0 {
            return Err(DxError::Config(
                "trainer.min_samples_per_class must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&t.test_fraction) {
            return Err(DxError::Config(format!(
                "trainer.test_fraction must be in [0, 1), got {}",
                t.test_fraction
            )));
        }
        let f = &self.forest;
        if f.n_trees == 0 || f.max_depth == 0 {
            return Err(DxError::Config(
                "forest.n_trees and forest.max_depth must be at least 1".into(),
            ));
        }
        if f.min_samples_leaf == 0 || f.min_samples_split < 2 {
            return Err(DxError::Config(
                "forest.min_samples_leaf must be >= 1 and forest.min_samples_split >= 2".into(),
            ));
        }
        if self.diagnosis.top_k == 0 {
            return Err(DxError::Config("diagnosis.top_k must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.matcher.threshold, 0.6);
        assert_eq!(config.matcher.suggestion_band, 0.7);
        assert_eq!(config.matcher.max_suggestions, 5);
        assert_eq!(config.trainer.min_samples_per_class, 2);
        assert_eq!(config.trainer.test_fraction, 0.2);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.diagnosis.top_k, 3);
        assert_eq!(config.data.label_column, "prognosis");
        assert!(config.matcher.aliases.contains_key("fever"));
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [matcher]
            threshold = 0.8
            metric = "levenshtein"

            [forest]
            n_trees = 7
            max_features = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.matcher.threshold, 0.8);
        assert_eq!(config.matcher.metric, SimilarityMetric::Levenshtein);
        assert_eq!(config.matcher.max_suggestions, 5);
        assert_eq!(config.forest.n_trees, 7);
        assert_eq!(config.forest.max_features, MaxFeatures::Count(3));
        assert_eq!(config.forest.max_depth, 10);
        assert_eq!(config.trainer.seed, 42);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for text in [
            "[matcher]\nthreshold = 1.5",
            "[matcher]\nthreshold = 0.0",
            "[trainer]\ntest_fraction = 1.0",
            "[forest]\nn_trees = 0",
            "[diagnosis]\ntop_k = 0",
        ] {
            let err = EngineConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, DxError::Config(_)), "{text}");
        }
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(132), 11);
        assert_eq!(MaxFeatures::Sqrt.resolve(3), 1);
        assert_eq!(MaxFeatures::All.resolve(3), 3);
        assert_eq!(MaxFeatures::Count(50).resolve(3), 3);
        assert_eq!(MaxFeatures::Count(0).resolve(3), 1);
    }
}
