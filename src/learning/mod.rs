// File: src/learning/mod.rs
pub mod forest;

use crate::config::{ForestParams, TrainerConfig};
use crate::core::types::{DiseaseLabel, TrainingRow};
use crate::error::{DxError, Result};
use forest::RandomForest;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;

/// The artifact produced by training and queried by every diagnosis.
pub type TrainedModel = RandomForest;

/// Anything that can turn a feature vector into per-class probabilities.
pub trait ProbabilisticClassifier {
    /// Class labels in class-index order.
    fn classes(&self) -> &[DiseaseLabel];
    fn n_features(&self) -> usize;
    /// One probability per class, in class-index order.
    fn predict_proba(&self, features: &[bool]) -> Vec<f64>;
}

/// What training did, for the startup log and the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Hold-out accuracy; informational only.
    pub accuracy: f64,
    pub train_size: usize,
    pub holdout_size: usize,
    pub dropped_labels: Vec<DiseaseLabel>,
    /// Samples per retained class, most frequent first.
    pub class_counts: Vec<(DiseaseLabel, usize)>,
}

pub struct ClassifierTrainer {
    config: TrainerConfig,
    params: ForestParams,
}

impl ClassifierTrainer {
    pub fn new(config: TrainerConfig, params: ForestParams) -> Self {
        Self { config, params }
    }

    /// Filters rare labels, splits stratified, fits the forest and scores it
    /// on the held-out rows.
    pub fn train(
        &self,
        rows: &[TrainingRow],
        n_features: usize,
    ) -> Result<(TrainedModel, TrainingReport)> {
        if let Some(bad) = rows.iter().position(|r| r.features.len() != n_features) {
            return Err(DxError::data(
                "training rows",
                format!(
                    "row {bad} has {} features, expected {n_features}",
                    rows[bad].features.len()
                ),
            ));
        }

        let (kept, classes, dropped) = self.filter_rare(rows)?;
        let class_index: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let labels: Vec<usize> = kept
            .iter()
            .map(|r| class_index[r.label.as_str()])
            .collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (train_idx, test_idx) =
            stratified_split(&labels, classes.len(), self.config.test_fraction, &mut rng);

        let train_x: Vec<Vec<bool>> = train_idx
            .iter()
            .map(|&i| kept[i].features.clone())
            .collect();
        let train_y: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();

        log::info!(
            "Training random forest: {} trees, {} samples, {} classes, {} symptoms",
            self.params.n_trees,
            train_x.len(),
            classes.len(),
            n_features
        );
        let model = RandomForest::fit(
            &train_x,
            &train_y,
            classes.clone(),
            &self.params,
            self.config.seed,
        );

        let accuracy = if test_idx.is_empty() {
            log::warn!("Hold-out partition is empty; accuracy not measured");
            0.0
        } else {
            let correct = test_idx
                .iter()
                .filter(|&&i| model.predict(&kept[i].features) == labels[i])
                .count();
            correct as f64 / test_idx.len() as f64
        };

        let mut class_counts: Vec<(DiseaseLabel, usize)> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), labels.iter().filter(|&&l| l == i).count()))
            .collect();
        class_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        log::info!(
            "Model trained: accuracy {:.2}% on {} held-out samples",
            accuracy * 100.0,
            test_idx.len()
        );
        for (disease, count) in class_counts.iter().take(5) {
            log::info!("  {disease}: {count} cases");
        }

        let report = TrainingReport {
            accuracy,
            train_size: train_idx.len(),
            holdout_size: test_idx.len(),
            dropped_labels: dropped,
            class_counts,
        };
        Ok((model, report))
    }

    /// Drops every row whose label occurs fewer than `min_samples_per_class`
    /// times. Returns kept rows, sorted class labels and dropped labels.
    fn filter_rare<'r>(
        &self,
        rows: &'r [TrainingRow],
    ) -> Result<(Vec<&'r TrainingRow>, Vec<DiseaseLabel>, Vec<DiseaseLabel>)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in rows {
            *counts.entry(row.label.as_str()).or_insert(0) += 1;
        }

        let min = self.config.min_samples_per_class;
        let (classes, dropped): (Vec<_>, Vec<_>) =
            counts.iter().partition(|(_, count)| **count >= min);
        let classes: Vec<DiseaseLabel> = classes.into_iter().map(|(l, _)| l.to_string()).collect();
        let dropped: Vec<DiseaseLabel> = dropped.into_iter().map(|(l, _)| l.to_string()).collect();

        if !dropped.is_empty() {
            log::warn!(
                "Found {} disease(s) with fewer than {min} samples:",
                dropped.len()
            );
            for label in dropped.iter().take(5) {
                log::warn!("  - {label}");
            }
            if dropped.len() > 5 {
                log::warn!("  ... and {} more", dropped.len() - 5);
            }
        }

        if classes.len() < 2 {
            return Err(DxError::InsufficientData {
                classes: classes.len(),
            });
        }

        let kept = rows
            .iter()
            .filter(|r| counts[r.label.as_str()] >= min)
            .collect();
        Ok((kept, classes, dropped))
    }
}

/// Splits row indices per class so each class keeps its share in both
/// partitions.
///
/// A class with `n` rows sends `min(round(n * test_fraction), n - 1)` of them
/// to the hold-out set, so every class is always present in training even
/// when it has a single row left.
pub fn stratified_split(
    labels: &[usize],
    n_classes: usize,
    test_fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label].push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for mut members in by_class {
        if members.is_empty() {
            continue;
        }
        members.shuffle(rng);
        let wanted = (members.len() as f64 * test_fraction).round() as usize;
        let n_test = wanted.min(members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(features: &[bool], label: &str) -> TrainingRow {
        TrainingRow {
            features: features.to_vec(),
            label: label.to_string(),
        }
    }

    fn trainer(min: usize) -> ClassifierTrainer {
        ClassifierTrainer::new(
            TrainerConfig {
                min_samples_per_class: min,
                ..TrainerConfig::default()
            },
            ForestParams {
                n_trees: 20,
                ..ForestParams::default()
            },
        )
    }

    /// fever, cough, headache
    fn flu_and_cold() -> Vec<TrainingRow> {
        let mut rows = Vec::new();
        rows.extend((0..10).map(|_| row(&[true, true, false], "flu")));
        rows.extend((0..8).map(|_| row(&[false, true, false], "cold")));
        rows
    }

    #[test]
    fn split_keeps_every_class_in_training() {
        let labels = vec![0, 0, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2];
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = stratified_split(&labels, 3, 0.5, &mut rng);
        for class in 0..3 {
            assert!(train.iter().any(|&i| labels[i] == class), "class {class}");
        }
        // the singleton class never reaches the hold-out set
        assert!(!test.iter().any(|&i| labels[i] == 1));
        assert_eq!(train.len() + test.len(), labels.len());
        assert_eq!(test.iter().filter(|&&i| labels[i] == 2).count(), 5);
    }

    #[test]
    fn two_member_class_stays_in_training_at_default_fraction() {
        let labels = vec![0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];
        let mut rng = StdRng::seed_from_u64(9);
        let (train, test) = stratified_split(&labels, 2, 0.2, &mut rng);
        assert_eq!(train.iter().filter(|&&i| labels[i] == 0).count(), 2);
        assert_eq!(test.len(), 2);
    }

    #[test]
    fn rare_labels_are_dropped_from_the_model() {
        let mut rows = flu_and_cold();
        rows.push(row(&[false, false, true], "migraine"));
        let (model, report) = trainer(2).train(&rows, 3).unwrap();
        assert_eq!(model.classes(), &["cold".to_string(), "flu".to_string()]);
        assert_eq!(report.dropped_labels, vec!["migraine".to_string()]);
        assert_eq!(report.train_size + report.holdout_size, 18);
    }

    #[test]
    fn fewer_than_two_classes_is_insufficient() {
        let rows: Vec<_> = (0..5)
            .map(|_| row(&[true], "flu"))
            .chain([row(&[false], "cold")])
            .collect();
        let err = trainer(2).train(&rows, 1).unwrap_err();
        assert!(matches!(err, DxError::InsufficientData { classes: 1 }));
    }

    #[test]
    fn mismatched_row_width_is_rejected() {
        let rows = vec![row(&[true, false], "a"), row(&[true], "b")];
        assert!(matches!(
            trainer(1).train(&rows, 2).unwrap_err(),
            DxError::Data { .. }
        ));
    }

    #[test]
    fn separable_data_scores_perfect_holdout() {
        let (model, report) = trainer(2).train(&flu_and_cold(), 3).unwrap();
        assert_eq!(report.holdout_size, 4);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.class_counts[0], ("flu".to_string(), 10));
        assert_eq!(model.n_features(), 3);
    }
}
