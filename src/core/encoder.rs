// File: src/core/encoder.rs
use crate::core::types::{FeatureVector, SymptomId};
use crate::core::vocabulary::SymptomVocabulary;
use std::collections::BTreeSet;

/// Binary presence encoding aligned with the vocabulary the model was trained on.
/// Output length is always `width`, whatever the input contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEncoder {
    width: usize,
}

impl FeatureEncoder {
    pub fn new(vocabulary: &SymptomVocabulary) -> Self {
        Self { width: vocabulary.len() }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Sets 1.0 for every known id. Ids outside the vocabulary are ignored,
    /// never shifted into another slot.
    pub fn encode(&self, symptoms: &BTreeSet<SymptomId>) -> FeatureVector {
        let mut vector = FeatureVector::zeros(self.width);
        for &id in symptoms {
            if id < self.width {
                vector.set(id, 1.0);
            } else {
                tracing::debug!(id, width = self.width, "Dropping symptom id outside vocabulary");
            }
        }
        vector
    }

}
