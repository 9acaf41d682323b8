use crate::config::EngineConfig;
use crate::core::treatment::TreatmentBook;
use crate::core::types::{
    MatchResult, PhraseMatch, Prediction, PresentSymptomSet, RankedDisease,
};
use crate::core::vocabulary::SymptomVocabulary;
use crate::dataset::{self, TrainingTable};
use crate::error::{DxError, Result};
use crate::fuzzy::matcher::SymptomMatcher;
use crate::learning::{ClassifierTrainer, ProbabilisticClassifier, TrainedModel, TrainingReport};
use serde::Serialize;

/// Ranks diseases for a set of present symptoms.
///
/// The feature vector is built strictly against `vocabulary`; probabilities
/// are returned as the model produced them. Ties keep class-index order.
pub fn diagnose<M>(
    symptoms: &PresentSymptomSet,
    vocabulary: &SymptomVocabulary,
    model: &M,
    top_k: usize,
) -> Result<Prediction>
where
    M: ProbabilisticClassifier + ?Sized,
{
    if symptoms.is_empty() {
        return Err(DxError::EmptyInput);
    }
    debug_assert_eq!(model.n_features(), vocabulary.len());

    let mut features = vec![false; vocabulary.len()];
    for symptom in symptoms.iter() {
        let idx = vocabulary
            .position(symptom)
            .ok_or_else(|| DxError::UnknownSymptom(symptom.to_string()))?;
        features[idx] = true;
    }

    let proba = model.predict_proba(&features);
    let mut order: Vec<usize> = (0..proba.len()).collect();
    // Stable sort: equal probabilities stay in ascending class order.
    order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));

    let classes = model.classes();
    let ranked = order
        .into_iter()
        .take(top_k)
        .map(|i| RankedDisease {
            disease: classes[i].clone(),
            confidence: proba[i],
        })
        .collect();
    Ok(Prediction::from_ranked(ranked))
}

/// A ranked prediction with the treatment text for its top disease.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub symptoms: PresentSymptomSet,
    pub prediction: Prediction,
    pub treatment: String,
}

/// Everything one conversational request produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consultation {
    /// Every phrase the user typed, in order, with its outcome.
    pub phrases: Vec<PhraseMatch>,
    /// `None` when no phrase matched; the caller should ask for symptoms again.
    pub diagnosis: Option<Diagnosis>,
}

impl Consultation {
    pub fn unmatched(&self) -> impl Iterator<Item = &PhraseMatch> {
        self.phrases
            .iter()
            .filter(|p| p.result.matched().is_none())
    }

    pub fn has_notices(&self) -> bool {
        self.unmatched().next().is_some()
    }

    pub fn matched_phrases(&self) -> impl Iterator<Item = &PhraseMatch> {
        self.phrases.iter().filter(|p| matches!(p.result, MatchResult::Matched(_)))
    }
}

/// The trained model, its vocabulary and the treatment book, built once at
/// startup and then only read.
///
/// Construction is the readiness barrier: a service value exists only after
/// loading and training have succeeded.
pub struct DiagnosisService {
    vocabulary: SymptomVocabulary,
    matcher: SymptomMatcher,
    model: TrainedModel,
    treatments: TreatmentBook,
    report: TrainingReport,
    top_k: usize,
}

impl DiagnosisService {
    /// Loads both tables named in `config` and trains the model.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        log::info!("Loading training data...");
        let table =
            dataset::load_training_table(&config.data.training_csv, &config.data.label_column)?;
        log::info!("Loading treatment data...");
        let treatments = dataset::load_treatment_table(&config.data.treatments_csv)?;
        Self::from_parts(table, treatments, config)
    }

    /// Trains on an already loaded table.
    pub fn from_parts(
        table: TrainingTable,
        treatments: TreatmentBook,
        config: &EngineConfig,
    ) -> Result<Self> {
        let trainer = ClassifierTrainer::new(config.trainer.clone(), config.forest.clone());
        let (model, report) = trainer.train(&table.rows, table.vocabulary.len())?;
        Ok(Self {
            vocabulary: table.vocabulary,
            matcher: SymptomMatcher::new(config.matcher.clone()),
            model,
            treatments,
            report,
            top_k: config.diagnosis.top_k,
        })
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn matcher(&self) -> &SymptomMatcher {
        &self.matcher
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn treatments(&self) -> &TreatmentBook {
        &self.treatments
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    /// The full vocabulary in display form.
    pub fn known_symptoms(&self) -> Vec<&str> {
        self.vocabulary.display_names().collect()
    }

    /// Display names of entries containing `partial`, for type-ahead hints.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<&str> {
        self.matcher
            .suggest_prefix(partial, &self.vocabulary, limit)
            .into_iter()
            .filter_map(|name| self.vocabulary.display_name(name))
            .collect()
    }

    pub fn match_input(&self, text: &str) -> Vec<PhraseMatch> {
        self.matcher.match_input(text, &self.vocabulary)
    }

    pub fn diagnose(&self, symptoms: &PresentSymptomSet) -> Result<Diagnosis> {
        let prediction = diagnose(symptoms, &self.vocabulary, &self.model, self.top_k)?;
        let treatment = prediction
            .top()
            .map(|top| self.treatments.lookup(&top.disease))
            .unwrap_or(crate::core::treatment::FALLBACK_TREATMENT)
            .to_string();
        Ok(Diagnosis {
            symptoms: symptoms.clone(),
            prediction,
            treatment,
        })
    }

    /// Matches free text phrase by phrase and diagnoses whatever matched.
    pub fn consult(&self, text: &str) -> Result<Consultation> {
        let phrases = self.match_input(text);
        let symptoms = PresentSymptomSet::from_matches(&phrases);
        let diagnosis = match self.diagnose(&symptoms) {
            Ok(diagnosis) => Some(diagnosis),
            Err(DxError::EmptyInput) => None,
            Err(e) => return Err(e),
        };
        if let Some(d) = &diagnosis {
            log::debug!(
                "{} symptom(s) -> {:?}",
                d.symptoms.len(),
                d.prediction.top().map(|t| &t.disease)
            );
        }
        Ok(Consultation { phrases, diagnosis })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DiseaseLabel, SymptomName};
    use std::path::Path;

    /// Fixed probabilities, for exercising ranking without training.
    struct Fixed {
        classes: Vec<DiseaseLabel>,
        proba: Vec<f64>,
    }

    impl ProbabilisticClassifier for Fixed {
        fn classes(&self) -> &[DiseaseLabel] {
            &self.classes
        }
        fn n_features(&self) -> usize {
            2
        }
        fn predict_proba(&self, _features: &[bool]) -> Vec<f64> {
            self.proba.clone()
        }
    }

    fn vocab() -> SymptomVocabulary {
        SymptomVocabulary::build(Path::new("t.csv"), &["fever", "cough"]).unwrap()
    }

    fn set(names: &[&str]) -> PresentSymptomSet {
        names.iter().filter_map(|n| SymptomName::new(n)).collect()
    }

    fn fixed(proba: &[f64]) -> Fixed {
        Fixed {
            classes: (0..proba.len()).map(|i| format!("d{i}")).collect(),
            proba: proba.to_vec(),
        }
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = diagnose(&PresentSymptomSet::new(), &vocab(), &fixed(&[0.5, 0.5]), 3)
            .unwrap_err();
        assert!(matches!(err, DxError::EmptyInput));
    }

    #[test]
    fn unknown_symptom_is_rejected() {
        let err = diagnose(&set(&["rash"]), &vocab(), &fixed(&[1.0]), 3).unwrap_err();
        assert!(matches!(err, DxError::UnknownSymptom(s) if s == "rash"));
    }

    #[test]
    fn top_k_sorted_with_index_tiebreak() {
        let model = fixed(&[0.1, 0.3, 0.3, 0.2, 0.1]);
        let p = diagnose(&set(&["fever"]), &vocab(), &model, 3).unwrap();
        let names: Vec<_> = p.iter().map(|r| r.disease.as_str()).collect();
        assert_eq!(names, vec!["d1", "d2", "d3"]);
        assert_eq!(p.top().unwrap().confidence, 0.3);
    }

    #[test]
    fn fewer_classes_than_k() {
        let p = diagnose(&set(&["cough"]), &vocab(), &fixed(&[0.25, 0.75]), 3).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.top().unwrap().disease, "d1");
    }
}
