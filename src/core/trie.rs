// --- File: src/core/trie.rs
use crate::core::types::SymptomId;
use std::collections::HashMap;

// --- PhraseTrie: word-level trie over synonym phrases ---

#[derive(Clone, Debug)]
struct PhraseNode {
    children: HashMap<String, usize>,
    symptom: Option<SymptomId>,
}

impl PhraseNode {
    fn new() -> Self {
        Self { children: HashMap::new(), symptom: None }
    }
}

/// An arena-backed trie keyed by whole words, so a phrase can only match on
/// word boundaries ("pain" never matches inside "painful").
/// Built once at load time and read-only afterwards.
#[derive(Clone, Debug)]
pub struct PhraseTrie {
    nodes: Vec<PhraseNode>,
    phrase_count: usize,
}

impl Default for PhraseTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseTrie {
    pub fn new() -> Self {
        Self { nodes: vec![PhraseNode::new()], phrase_count: 0 }
    }

    pub fn len(&self) -> usize {
        self.phrase_count
    }

    pub fn is_empty(&self) -> bool {
        self.phrase_count == 0
    }

    /// Maps a phrase (already split into words) to a symptom.
    /// Re-inserting an existing phrase replaces its symptom.
    /// O(k) where k is the number of words.
    pub fn insert<S: AsRef<str>>(&mut self, words: &[S], symptom: SymptomId) {
        if words.is_empty() {
            return;
        }
        let mut node_idx = 0;
        for word in words {
            let word = word.as_ref();
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(word) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(PhraseNode::new());
                self.nodes[node_idx].children.insert(word.to_string(), new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }
        if self.nodes[node_idx].symptom.replace(symptom).is_none() {
            self.phrase_count += 1;
        }
    }

    /// Longest phrase that starts at `words[0]`.
    /// Returns the number of words consumed and the symptom it maps to.
    pub fn longest_prefix_match<S: AsRef<str>>(&self, words: &[S]) -> Option<(usize, SymptomId)> {
        let mut node_idx = 0;
        let mut best = None;
        for (depth, word) in words.iter().enumerate() {
            match self.nodes[node_idx].children.get(word.as_ref()) {
                Some(&next_idx) => node_idx = next_idx,
                None => break,
            }
            if let Some(symptom) = self.nodes[node_idx].symptom {
                best = Some((depth + 1, symptom));
            }
        }
        best
    }

    /// Leftmost-longest scan: at each position take the longest phrase that
    /// starts there, then continue after it. Overlapping shorter phrases inside
    /// a longer match are never reported.
    pub fn scan<S: AsRef<str>>(&self, words: &[S]) -> Vec<PhraseSpan> {
        let mut spans = Vec::new();
        let mut start = 0;
        while start < words.len() {
            match self.longest_prefix_match(&words[start..]) {
                Some((len, symptom)) => {
                    spans.push(PhraseSpan { start, len, symptom });
                    start += len;
                }
                None => start += 1,
            }
        }
        spans
    }
}

/// A run of words `[start, start + len)` that matched one phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseSpan {
    pub start: usize,
    pub len: usize,
    pub symptom: SymptomId,
}

impl PhraseSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn sample() -> PhraseTrie {
        let mut trie = PhraseTrie::new();
        trie.insert(&words("pain"), 0);
        trie.insert(&words("chest pain"), 1);
        trie.insert(&words("chest"), 2);
        trie.insert(&words("shortness of breath"), 3);
        trie
    }

    #[test]
    fn complete_phrases_only() {
        let trie = sample();
        assert_eq!(trie.longest_prefix_match(&words("chest pain")), Some((2, 1)));
        assert_eq!(trie.longest_prefix_match(&words("of breath")), None);
        assert_eq!(trie.len(), 4);
    }

    #[test]
    fn longest_prefix_wins() {
        let trie = sample();
        assert_eq!(trie.longest_prefix_match(&words("chest pain today")), Some((2, 1)));
        assert_eq!(trie.longest_prefix_match(&words("chest hurts")), Some((1, 2)));
        assert_eq!(trie.longest_prefix_match(&words("shortness of")), None);
    }

    #[test]
    fn scan_does_not_report_nested_phrase() {
        let trie = sample();
        let spans = trie.scan(&words("sharp chest pain and shortness of breath"));
        let found: Vec<_> = spans.iter().map(|s| s.symptom).collect();
        assert_eq!(found, vec![1, 3]);
        assert_eq!(spans[0].start, 1);
        assert_eq!(spans[0].end(), 3);
    }

    #[test]
    fn reinsert_replaces_target_without_double_count() {
        let mut trie = sample();
        trie.insert(&words("pain"), 9);
        assert_eq!(trie.longest_prefix_match(&words("pain")), Some((1, 9)));
        assert_eq!(trie.len(), 4);
    }
}
