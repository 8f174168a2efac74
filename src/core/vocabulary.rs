// File: src/core/vocabulary.rs
use crate::core::types::{DiseaseId, SymptomId};
use crate::error::{LoadError, LoadResult};
use std::collections::HashMap;

/// An ordered list of unique, trimmed keys with O(1) reverse lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderedKeys {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

impl OrderedKeys {
    fn build<I, S>(items: I, kind: &'static str) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = Vec::new();
        let mut index = HashMap::new();
        for item in items {
            let key = item.as_ref().trim();
            if key.is_empty() {
                return Err(LoadError::DuplicateKey {
                    kind,
                    key: "<blank>".to_string(),
                });
            }
            if index.insert(key.to_string(), keys.len()).is_some() {
                return Err(LoadError::DuplicateKey {
                    kind,
                    key: key.to_string(),
                });
            }
            keys.push(key.to_string());
        }
        Ok(Self { keys, index })
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key.trim()).copied()
    }
}

/// The ordered feature space the classifier was trained on.
/// Position `i` is feature `i`; the order never changes after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomVocabulary {
    inner: OrderedKeys,
}

impl SymptomVocabulary {
    pub fn new<I, S>(symptoms: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            inner: OrderedKeys::build(symptoms, "symptom")?,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.keys.is_empty()
    }

    pub fn id_of(&self, symptom: &str) -> Option<SymptomId> {
        self.inner.position(symptom)
    }

    pub fn name(&self, id: SymptomId) -> Option<&str> {
        self.inner.keys.get(id).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.inner.keys
    }
}

/// The classifier's output classes, in output order.
///
/// Labels are trimmed on the way in. Two labels that only differ by case or
/// inner spacing are rejected, since they would otherwise split one disease
/// across two classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseLabelSet {
    inner: OrderedKeys,
}

impl DiseaseLabelSet {
    pub fn new<I, S>(labels: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let inner = OrderedKeys::build(labels, "disease label")?;
        let mut folded: HashMap<String, &str> = HashMap::new();
        for label in &inner.keys {
            let key = fold_label(label);
            if let Some(first) = folded.insert(key, label) {
                return Err(LoadError::NearDuplicateLabel {
                    first: first.to_string(),
                    second: label.clone(),
                });
            }
        }
        Ok(Self { inner })
    }

    pub fn len(&self) -> usize {
        self.inner.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.keys.is_empty()
    }

    pub fn id_of(&self, label: &str) -> Option<DiseaseId> {
        self.inner.position(label)
    }

    pub fn name(&self, id: DiseaseId) -> Option<&str> {
        self.inner.keys.get(id).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.inner.keys
    }
}

fn fold_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
