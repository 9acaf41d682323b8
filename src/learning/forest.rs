// File: src/learning/forest.rs
use crate::config::ForestParams;
use crate::core::types::DiseaseLabel;
use crate::learning::ProbabilisticClassifier;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Tree nodes live in a flat arena; children are referenced by index.
#[derive(Debug, Clone)]
enum Node {
    Leaf {
        /// Class frequencies at this leaf, summing to 1.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        absent: usize,
        present: usize,
    },
}

/// A CART tree over boolean features, split on Gini impurity.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Walks from the root to a leaf. O(depth).
    pub fn leaf_distribution(&self, features: &[bool]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    absent,
                    present,
                } => {
                    idx = if features[*feature] { *present } else { *absent };
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.depth_from(0)
    }

    #[cfg(test)]
    fn depth_from(&self, idx: usize) -> usize {
        match &self.nodes[idx] {
            Node::Leaf { .. } => 0,
            Node::Split {
                absent, present, ..
            } => 1 + self.depth_from(*absent).max(self.depth_from(*present)),
        }
    }
}

struct TreeBuilder<'a> {
    features: &'a [Vec<bool>],
    labels: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    impurity: f64,
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &s in samples {
            counts[self.labels[s]] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let distribution = counts
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&samples);
        let total = samples.len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure || depth >= self.params.max_depth || total < self.params.min_samples_split {
            return self.leaf(&counts, total);
        }

        let Some(best) = self.find_split(&samples, &counts) else {
            return self.leaf(&counts, total);
        };

        let (present, absent): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.features[s][best.feature]);

        // Reserve the split slot before the children so the root stays at 0.
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let absent_idx = self.grow(absent, depth + 1);
        let present_idx = self.grow(present, depth + 1);
        self.nodes[slot] = Node::Split {
            feature: best.feature,
            absent: absent_idx,
            present: present_idx,
        };
        slot
    }

    /// Draws features in random order and scores at least `max_features` of
    /// them, continuing past that budget while no valid split has been found.
    fn find_split(&mut self, samples: &[usize], counts: &[usize]) -> Option<BestSplit> {
        let n_features = self.features[0].len();
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(&mut self.rng);

        let parent = gini(counts, samples.len());
        let mut best: Option<BestSplit> = None;

        for (visited, &feature) in order.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let mut present = vec![0usize; self.n_classes];
            let mut n_present = 0;
            for &s in samples {
                if self.features[s][feature] {
                    present[self.labels[s]] += 1;
                    n_present += 1;
                }
            }
            let n_absent = samples.len() - n_present;
            if n_present < self.params.min_samples_leaf || n_absent < self.params.min_samples_leaf
            {
                continue;
            }
            let absent: Vec<usize> = counts.iter().zip(&present).map(|(c, p)| c - p).collect();
            let weighted = (n_present as f64 * gini(&present, n_present)
                + n_absent as f64 * gini(&absent, n_absent))
                / samples.len() as f64;

            if parent - weighted <= 1e-12 {
                continue;
            }
            if best.as_ref().map_or(true, |b| weighted < b.impurity) {
                best = Some(BestSplit {
                    feature,
                    impurity: weighted,
                });
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Bagged ensemble of decision trees; the trained model held for the process lifetime.
///
/// Immutable once fitted, so it can be shared freely across sessions and threads.
#[derive(Debug, Clone)]
pub struct RandomForest {
    classes: Vec<DiseaseLabel>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits `params.n_trees` trees on bootstrap samples of `rows`.
    ///
    /// `labels[i]` indexes into `classes`. Tree `t` draws from its own RNG
    /// seeded with `seed + t`, so the result does not depend on how rayon
    /// schedules the work.
    pub fn fit(
        features: &[Vec<bool>],
        labels: &[usize],
        classes: Vec<DiseaseLabel>,
        params: &ForestParams,
        seed: u64,
    ) -> Self {
        let n_features = features.first().map_or(0, Vec::len);
        let max_features = params.max_features.resolve(n_features);
        let n_classes = classes.len();

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..features.len())
                    .map(|_| rng.random_range(0..features.len()))
                    .collect();
                let mut builder = TreeBuilder {
                    features,
                    labels,
                    n_classes,
                    params,
                    max_features,
                    rng,
                    nodes: Vec::new(),
                };
                builder.grow(bootstrap, 0);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Self {
            classes,
            n_features,
            trees,
        }
    }

    #[cfg(test)]
    pub(crate) fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Index of the most probable class; the lowest index wins ties.
    pub fn predict(&self, features: &[bool]) -> usize {
        let proba = self.predict_proba(features);
        let mut best = 0;
        for (i, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = i;
            }
        }
        best
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn classes(&self) -> &[DiseaseLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the trees' leaf distributions.
    fn predict_proba(&self, features: &[bool]) -> Vec<f64> {
        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_distribution(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        sum.iter_mut().for_each(|p| *p /= n);
        sum
    }
}
