// File: src/core/knowledge.rs
use crate::core::vocabulary::DiseaseLabelSet;
use crate::error::{LoadError, LoadResult};
use std::collections::{BTreeSet, HashMap};

/// Description and precautions for one disease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub description: Option<String>,
    pub precautions: Vec<String>,
}

/// Read-only lookup tables keyed by trimmed disease label.
#[derive(Debug, Clone, Default)]
pub struct DiseaseKnowledge {
    descriptions: HashMap<String, String>,
    precautions: HashMap<String, Vec<String>>,
}

impl DiseaseKnowledge {
    /// Keys are trimmed. Blank precaution cells are dropped, order kept.
    pub fn new<D, P>(descriptions: D, precautions: P) -> Self
    where
        D: IntoIterator<Item = (String, String)>,
        P: IntoIterator<Item = (String, Vec<String>)>,
    {
        let descriptions = descriptions
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let precautions = precautions
            .into_iter()
            .map(|(k, items)| {
                let items = items
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                (k.trim().to_string(), items)
            })
            .collect();
        Self { descriptions, precautions }
    }

    /// Never fails: a missing label yields no description and no precautions.
    pub fn lookup(&self, label: &str) -> KnowledgeEntry {
        let key = label.trim();
        KnowledgeEntry {
            description: self.descriptions.get(key).cloned(),
            precautions: self.precautions.get(key).cloned().unwrap_or_default(),
        }
    }

    pub fn description_count(&self) -> usize {
        self.descriptions.len()
    }

    pub fn precaution_count(&self) -> usize {
        self.precautions.len()
    }

    /// Both tables must cover exactly the classifier's labels.
    pub fn validate_against(&self, labels: &DiseaseLabelSet) -> LoadResult<()> {
        check_keyspace("descriptions", self.descriptions.keys(), labels)?;
        check_keyspace("precautions", self.precautions.keys(), labels)
    }
}

fn check_keyspace<'a>(
    table: &'static str,
    keys: impl Iterator<Item = &'a String>,
    labels: &DiseaseLabelSet,
) -> LoadResult<()> {
    let keys: BTreeSet<&str> = keys.map(String::as_str).collect();
    let expected: BTreeSet<&str> = labels.names().iter().map(String::as_str).collect();
    let missing: Vec<String> = expected.difference(&keys).map(|s| s.to_string()).collect();
    let orphaned: Vec<String> = keys.difference(&expected).map(|s| s.to_string()).collect();
    if missing.is_empty() && orphaned.is_empty() {
        Ok(())
    } else {
        Err(LoadError::KeyspaceMismatch { table, missing, orphaned })
    }
}
