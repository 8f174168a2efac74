// File: src/core/classifier.rs
use crate::core::types::{FeatureVector, ScoredDisease};
use crate::core::vocabulary::DiseaseLabelSet;
use crate::error::{LoadError, LoadResult, ValidationError};
use std::fmt;

/// Any trained model that maps a presence vector to class probabilities.
/// Implementations must be read-only after construction.
pub trait DiseaseModel: Send + Sync + fmt::Debug {
    fn n_features(&self) -> usize;
    fn n_classes(&self) -> usize;
    /// One score per class, in class-index order.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;
}

/// Binds a model to the disease labels its class indices refer to.
#[derive(Debug)]
pub struct DiseaseClassifier {
    model: Box<dyn DiseaseModel>,
    labels: DiseaseLabelSet,
}

impl DiseaseClassifier {
    pub fn new(model: Box<dyn DiseaseModel>, labels: DiseaseLabelSet) -> LoadResult<Self> {
        if model.n_classes() != labels.len() {
            return Err(LoadError::ArtifactMismatch {
                what: "classes",
                model: model.n_classes(),
                listed: labels.len(),
            });
        }
        Ok(Self { model, labels })
    }

    pub fn n_features(&self) -> usize {
        self.model.n_features()
    }

    pub fn labels(&self) -> &DiseaseLabelSet {
        &self.labels
    }

    /// Full distribution over every label, sorted by probability descending
    /// with ties broken alphabetically by label. Probabilities are
    /// renormalized to sum to 1; an all-zero output becomes uniform.
    pub fn predict(&self, features: &FeatureVector) -> Result<Vec<ScoredDisease>, ValidationError> {
        let expected = self.model.n_features();
        if features.len() != expected {
            return Err(ValidationError::FeatureLength {
                expected,
                actual: features.len(),
            });
        }

        let raw = self.model.predict_proba(features.as_slice());
        let n = self.labels.len();
        let clean: Vec<f64> = (0..n)
            .map(|i| raw.get(i).copied().filter(|p| p.is_finite() && *p > 0.0).unwrap_or(0.0))
            .collect();
        let total: f64 = clean.iter().sum();

        let mut scored: Vec<ScoredDisease> = self
            .labels
            .names()
            .iter()
            .zip(clean)
            .map(|(name, p)| ScoredDisease {
                disease: name.clone(),
                probability: if total > 0.0 { p / total } else { 1.0 / n as f64 },
            })
            .collect();
        scored.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| a.disease.cmp(&b.disease))
        });
        Ok(scored)
    }
}
