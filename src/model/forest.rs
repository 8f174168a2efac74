// File: src/model/forest.rs
use super::tree::{DecisionTree, TrainingView, TreeLimits};
use crate::core::classifier::DiseaseModel;
use crate::error::TrainError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hyperparameters for forest training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Weight each class inversely to its frequency.
    pub balanced_class_weight: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 25,
            min_samples_split: 5,
            min_samples_leaf: 2,
            balanced_class_weight: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), TrainError> {
        if self.n_trees == 0 {
            return Err(TrainError::InvalidParameter("n_trees must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(TrainError::InvalidParameter("max_depth must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainError::InvalidParameter("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainError::InvalidParameter("min_samples_leaf must be at least 1".into()));
        }
        Ok(())
    }
}

/// Bagged ensemble of CART trees with per-split feature subsampling.
/// Probabilities are the mean of the leaf distributions across trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits a forest on a dense matrix. Identical inputs and `params.seed`
    /// always give an identical forest.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self, TrainError> {
        params.validate()?;
        if rows.is_empty() {
            return Err(TrainError::NoTrainingRecords(0));
        }
        if rows.len() != targets.len() {
            return Err(TrainError::InvalidParameter(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let n_features = rows[0].len();
        if let Some(bad) = rows.iter().position(|r| r.len() != n_features) {
            return Err(TrainError::InvalidParameter(format!(
                "row {bad} has {} features, expected {n_features}",
                rows[bad].len()
            )));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= n_classes) {
            return Err(TrainError::InvalidParameter(format!(
                "target {bad} out of range for {n_classes} classes"
            )));
        }

        let class_weights = class_weights(targets, n_classes, params.balanced_class_weight);
        let present = class_weights.iter().filter(|&&w| w > 0.0).count();
        if present < 2 {
            return Err(TrainError::TooFewClasses(present));
        }

        let view = TrainingView {
            rows,
            targets,
            class_weights: &class_weights,
            n_features,
        };
        let limits = TreeLimits {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = rows.len();
        let trees = (0..params.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(&view, bootstrap, &limits, &mut rng)
            })
            .collect();

        tracing::debug!(
            n_trees = params.n_trees,
            n_features,
            n_classes,
            samples = n,
            "Random forest fitted"
        );
        Ok(Self { n_features, n_classes, trees })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

/// Per-class sample weights. Balanced mode mirrors `n / (k * count_c)`
/// over the k classes actually present; absent classes get zero weight.
fn class_weights(targets: &[usize], n_classes: usize, balanced: bool) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &t in targets {
        counts[t] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count().max(1);
    let n = targets.len() as f64;
    counts
        .into_iter()
        .map(|c| match (c, balanced) {
            (0, _) => 0.0,
            (_, false) => 1.0,
            (c, true) => n / (present as f64 * c as f64),
        })
        .collect()
}

impl DiseaseModel for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.predict_distribution(features)) {
                *total += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        totals.iter_mut().for_each(|t| *t /= n);
        totals
    }
}
