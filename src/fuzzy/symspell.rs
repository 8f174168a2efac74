// File: src/fuzzy/symspell.rs
use crate::core::types::SymptomId;
use std::collections::{HashMap, HashSet};

/// Fuzzy phrase matcher based on the Symmetric Delete (SymSpell) algorithm.
/// Delete variants of every registered phrase are pre-computed, so a lookup
/// costs O(k^2) in the input length and is independent of the table size.
#[derive(Clone, Debug)]
pub struct SymSpell {
    /// Maps a delete variant (e.g., "hedache") to the phrases it could have
    /// come from, as indices into `phrases`.
    deletes: HashMap<String, HashSet<usize>>,
    phrases: Vec<(String, SymptomId)>,
    max_edit_distance: usize,
    /// Length in chars of the longest registered phrase.
    max_phrase_chars: usize,
}

/// A verified fuzzy hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub phrase: String,
    pub symptom: SymptomId,
    pub distance: usize,
}

impl SymSpell {
    pub fn new(max_edit_distance: usize) -> Self {
        Self {
            deletes: HashMap::new(),
            phrases: Vec::new(),
            max_edit_distance,
            max_phrase_chars: 0,
        }
    }

    /// Whether an input of `len` chars could be within `max_distance` of
    /// some registered phrase. Longer inputs are rejected before any delete
    /// variants are generated.
    pub fn can_match_len(&self, len: usize, max_distance: usize) -> bool {
        len <= self.max_phrase_chars + max_distance.min(self.max_edit_distance)
    }

    /// Registers a phrase by generating its delete variants up to the
    /// configured edit distance and mapping them back to the phrase.
    pub fn add_phrase(&mut self, phrase: &str, symptom: SymptomId) {
        let phrase_idx = self.phrases.len();
        self.phrases.push((phrase.to_string(), symptom));
        self.max_phrase_chars = self.max_phrase_chars.max(phrase.chars().count());
        for edit in self.generate_edits(phrase, self.max_edit_distance) {
            self.deletes.entry(edit).or_default().insert(phrase_idx);
        }
    }

    /// Best phrase within `max_distance` of `input` (capped by the index's
    /// own maximum). Ties go to the smaller distance, then the
    /// lexicographically smaller phrase, so the result is deterministic.
    pub fn lookup(&self, input: &str, max_distance: usize) -> Option<FuzzyMatch> {
        if !self.can_match_len(input.chars().count(), max_distance) {
            return None;
        }
        let max_distance = max_distance.min(self.max_edit_distance);
        let mut candidates = HashSet::new();
        for edit in self.generate_edits(input, max_distance) {
            if let Some(ids) = self.deletes.get(&edit) {
                candidates.extend(ids.iter().copied());
            }
        }

        candidates
            .into_iter()
            .filter_map(|idx| {
                let (phrase, symptom) = &self.phrases[idx];
                let distance = strsim::osa_distance(input, phrase);
                (distance <= max_distance).then(|| FuzzyMatch {
                    phrase: phrase.clone(),
                    symptom: *symptom,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.phrase.cmp(&b.phrase)))
    }

    /// All unique variants of `word` reachable by deleting up to `depth`
    /// characters, including the word itself. Works on chars, not bytes.
    fn generate_edits(&self, word: &str, depth: usize) -> HashSet<String> {
        let mut edits = HashSet::new();
        edits.insert(word.to_string()); // Distance 0

        let mut current_edits: Vec<Vec<char>> = vec![word.chars().collect()];
        for _ in 0..depth {
            let mut next_edits = Vec::new();
            for edit in &current_edits {
                for i in 0..edit.len() {
                    let mut deleted_variant = edit.clone();
                    deleted_variant.remove(i);
                    if edits.insert(deleted_variant.iter().collect()) {
                        next_edits.push(deleted_variant);
                    }
                }
            }
            current_edits = next_edits;
        }

        edits
    }
}
