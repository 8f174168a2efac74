// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Index of a canonical symptom in the `SymptomVocabulary`.
/// It is also the feature index the classifier was trained on.
pub type SymptomId = usize;

/// Index of a disease in the `DiseaseLabelSet`, matching the classifier's output order.
pub type DiseaseId = usize;

/// Symptoms seen with each disease in the training table.
pub type DiseaseProfiles = BTreeMap<DiseaseId, BTreeSet<SymptomId>>;

/// Display text used when a disease has no description on file.
pub const DESCRIPTION_NOT_AVAILABLE: &str = "No description available";

/// Fixed-length presence vector aligned with the symptom vocabulary.
/// Created per request and owned by that request only.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0.0)
    }

    /// Indices with a non-zero weight.
    pub fn active(&self) -> impl Iterator<Item = SymptomId> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w != 0.0)
            .map(|(i, _)| i)
    }

    pub(crate) fn set(&mut self, index: SymptomId, weight: f64) {
        self.0[index] = weight;
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(weights: Vec<f64>) -> Self {
        Self(weights)
    }
}

/// One (disease, probability) pair from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDisease {
    pub disease: String,
    pub probability: f64,
}

/// Coarse reading of a confidence score for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Moderate,
    LowModerate,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c >= 0.80 => ConfidenceBand::VeryHigh,
            c if c >= 0.60 => ConfidenceBand::High,
            c if c >= 0.40 => ConfidenceBand::Moderate,
            c if c >= 0.20 => ConfidenceBand::LowModerate,
            _ => ConfidenceBand::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::VeryHigh => "Very High",
            ConfidenceBand::High => "High",
            ConfidenceBand::Moderate => "Moderate",
            ConfidenceBand::LowModerate => "Low-Moderate",
            ConfidenceBand::Low => "Low",
        }
    }
}

/// Overlap between the detected symptoms and one disease's profile.
/// Informational only; it never changes `confidence`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMatch {
    /// Detected symptoms that belong to the profile.
    pub matched: usize,
    /// `matched` over the number of detected symptoms.
    pub precision: f64,
    /// `matched` over the profile size.
    pub coverage: f64,
}

impl ProfileMatch {
    pub fn between(detected: &BTreeSet<SymptomId>, profile: &BTreeSet<SymptomId>) -> Self {
        let matched = detected.intersection(profile).count();
        let ratio = |total: usize| if total == 0 { 0.0 } else { matched as f64 / total as f64 };
        Self {
            matched,
            precision: ratio(detected.len()),
            coverage: ratio(profile.len()),
        }
    }
}

/// A ranked disease hypothesis enriched with knowledge-base entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub disease: String,
    pub confidence: f64,
    pub band: ConfidenceBand,
    /// `None` when the knowledge base has no description for this label.
    pub description: Option<String>,
    pub precautions: Vec<String>,
    pub symptom_match: ProfileMatch,
}

impl Prediction {
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or(DESCRIPTION_NOT_AVAILABLE)
    }

    pub fn has_knowledge(&self) -> bool {
        self.description.is_some() && !self.precautions.is_empty()
    }
}

/// How much of the input the normalizer could use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recognition {
    /// The text was empty or whitespace.
    EmptyInput,
    /// Text was present but no symptom was recognized in it.
    Unrecognized,
    Recognized,
}

/// Output of one `predict_from_text` call, ranked by descending confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub recognition: Recognition,
    /// Canonical names of the symptoms that fed the classifier.
    pub detected_symptoms: Vec<String>,
    pub predictions: Vec<Prediction>,
}

impl PredictionResult {
    pub fn no_symptoms_recognized(&self) -> bool {
        self.recognition != Recognition::Recognized
    }

    pub fn top(&self) -> Option<&Prediction> {
        self.predictions.first()
    }
}
