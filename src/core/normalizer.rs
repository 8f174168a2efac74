//! Maps free-text symptom reports onto canonical symptom identifiers.
//!
//! Matching runs in two passes per clause:
//! 1. a leftmost-longest scan of the synonym trie, so "chest pain" wins over a
//!    shorter "pain" entry and exact multi-word phrases are found anywhere in
//!    the clause;
//! 2. a SymSpell fallback over the words the first pass left uncovered, which
//!    catches misspellings ("hedache") without touching filler words.
//!
//! Clauses are split on punctuation delimiters. Conjunctions ("and", "with")
//! stay inside the clause for the trie, so phrases such as "blurred and
//! distorted vision" still match, but they do split runs for the fuzzy pass.

use crate::core::trie::PhraseTrie;
use crate::core::types::{Recognition, SymptomId};
use crate::core::vocabulary::SymptomVocabulary;
use crate::error::{LoadError, LoadResult};
use crate::fuzzy::symspell::SymSpell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Characters that end a clause.
    pub punctuation_delimiters: String,
    /// Words that separate symptom mentions without ending the clause.
    pub conjunctions: Vec<String>,
    /// Words never considered for fuzzy matching.
    pub filler_words: Vec<String>,
    pub max_edit_distance: usize,
    /// Shortest word (in chars) the fuzzy pass will try to correct.
    pub fuzzy_min_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            punctuation_delimiters: ",;.!?/&():\n".to_string(),
            conjunctions: ["and", "or", "with", "plus", "also", "but", "then"]
                .into_iter()
                .map(String::from)
                .collect(),
            filler_words: [
                "i", "im", "ive", "am", "is", "are", "was", "have", "has", "had", "having",
                "been", "feel", "feels", "feeling", "my", "me", "the", "a", "an", "very",
                "really", "quite", "some", "since", "for", "of", "in", "on", "at", "got",
                "getting", "experiencing", "suffering", "from", "lot", "bit", "little",
                "bad", "badly", "severe", "terrible", "constant", "days", "weeks", "today",
                "yesterday", "sometimes", "always", "keep", "think",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_edit_distance: 2,
            fuzzy_min_len: 5,
        }
    }
}

/// Splits text into lowercase words, treating anything that is not
/// alphanumeric as a separator. Apostrophes are dropped ("i've" -> "ive").
pub fn phrase_words(text: &str) -> Vec<String> {
    split_clauses(text, &HashSet::new()).into_iter().flatten().collect()
}

fn split_clauses(text: &str, delimiters: &HashSet<char>) -> Vec<Vec<String>> {
    let mut clauses = Vec::new();
    let mut clause = Vec::new();
    let mut word = String::new();

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            word.push(c);
            continue;
        }
        if c == '\'' || c == '\u{2019}' {
            continue;
        }
        if !word.is_empty() {
            clause.push(std::mem::take(&mut word));
        }
        if delimiters.contains(&c) && !clause.is_empty() {
            clauses.push(std::mem::take(&mut clause));
        }
    }
    if !word.is_empty() {
        clause.push(word);
    }
    if !clause.is_empty() {
        clauses.push(clause);
    }
    clauses
}

/// Free-text phrase to canonical symptom, keyed by the phrase's normalized
/// words joined with single spaces. Every target is a vocabulary member.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: BTreeMap<String, SymptomId>,
}

impl SynonymTable {
    /// Registers every vocabulary identifier under its own spelling, so
    /// "skin_rash" and "skin rash" both resolve to `skin_rash`.
    pub fn for_vocabulary(vocabulary: &SymptomVocabulary) -> Self {
        let mut table = Self::default();
        for (id, name) in vocabulary.names().iter().enumerate() {
            let key = phrase_words(name).join(" ");
            if !key.is_empty() {
                table.entries.insert(key, id);
            }
        }
        table
    }

    /// Layers curated `(phrase, symptom)` pairs over the table. Curated
    /// entries replace generated ones with the same phrase.
    pub fn add_curated<I, P, S>(&mut self, vocabulary: &SymptomVocabulary, pairs: I) -> LoadResult<()>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<str>,
        S: AsRef<str>,
    {
        for (phrase, symptom) in pairs {
            let (phrase, symptom) = (phrase.as_ref(), symptom.as_ref().trim());
            let id = vocabulary.id_of(symptom).ok_or_else(|| LoadError::UnknownSynonymTarget {
                phrase: phrase.to_string(),
                symptom: symptom.to_string(),
            })?;
            let key = phrase_words(phrase).join(" ");
            if key.is_empty() {
                tracing::warn!(phrase, "Skipping synonym with no words");
                continue;
            }
            self.entries.insert(key, id);
        }
        Ok(())
    }

    pub fn get(&self, phrase: &str) -> Option<SymptomId> {
        self.entries.get(&phrase_words(phrase).join(" ")).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymptomId)> {
        self.entries.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MatchKind {
    Exact,
    Fuzzy { distance: usize },
}

/// One recognized mention: the words as typed and the symptom they mapped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomMatch {
    pub phrase: String,
    pub symptom: SymptomId,
    pub kind: MatchKind,
}

/// Result of normalizing one input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedSymptoms {
    /// True when the input had no words at all.
    pub empty_input: bool,
    pub symptoms: BTreeSet<SymptomId>,
    /// Mentions in input order; a symptom may appear more than once here.
    pub matches: Vec<SymptomMatch>,
}

impl NormalizedSymptoms {
    pub fn recognition(&self) -> Recognition {
        if self.empty_input {
            Recognition::EmptyInput
        } else if self.symptoms.is_empty() {
            Recognition::Unrecognized
        } else {
            Recognition::Recognized
        }
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    fn record(&mut self, phrase: String, symptom: SymptomId, kind: MatchKind) {
        self.symptoms.insert(symptom);
        self.matches.push(SymptomMatch { phrase, symptom, kind });
    }
}

/// Pure function over an immutable synonym index; safe to share across threads.
#[derive(Debug, Clone)]
pub struct SymptomNormalizer {
    trie: PhraseTrie,
    fuzzy: SymSpell,
    delimiters: HashSet<char>,
    conjunctions: HashSet<String>,
    fillers: HashSet<String>,
    fuzzy_min_len: usize,
}

impl SymptomNormalizer {
    pub fn new(table: &SynonymTable, config: &NormalizerConfig) -> Self {
        let mut trie = PhraseTrie::new();
        let mut fuzzy = SymSpell::new(config.max_edit_distance);
        for (phrase, symptom) in table.iter() {
            let words: Vec<&str> = phrase.split(' ').collect();
            trie.insert(&words, symptom);
            if phrase.chars().count() >= config.fuzzy_min_len {
                fuzzy.add_phrase(phrase, symptom);
            }
        }

        Self {
            trie,
            fuzzy,
            delimiters: config.punctuation_delimiters.chars().collect(),
            conjunctions: config.conjunctions.iter().map(|w| w.to_lowercase()).collect(),
            fillers: config.filler_words.iter().map(|w| w.to_lowercase()).collect(),
            fuzzy_min_len: config.fuzzy_min_len,
        }
    }

    pub fn phrase_count(&self) -> usize {
        self.trie.len()
    }

    /// Normalizes free text. An input with no words is reported through
    /// `empty_input`, not as an empty symptom set alone.
    pub fn normalize(&self, text: &str) -> NormalizedSymptoms {
        let clauses = split_clauses(text, &self.delimiters);
        self.normalize_clauses(clauses)
    }

    /// Normalizes a caller-supplied list of phrases; each phrase is its own clause.
    pub fn normalize_phrases<S: AsRef<str>>(&self, phrases: &[S]) -> NormalizedSymptoms {
        let clauses = phrases
            .iter()
            .flat_map(|p| split_clauses(p.as_ref(), &self.delimiters))
            .collect();
        self.normalize_clauses(clauses)
    }

    fn normalize_clauses(&self, clauses: Vec<Vec<String>>) -> NormalizedSymptoms {
        let mut out = NormalizedSymptoms {
            empty_input: clauses.is_empty(),
            ..Default::default()
        };
        for clause in &clauses {
            self.match_clause(clause, &mut out);
        }
        out
    }

    fn match_clause(&self, words: &[String], out: &mut NormalizedSymptoms) {
        let mut covered = vec![false; words.len()];

        for span in self.trie.scan(words) {
            let phrase = words[span.start..span.end()].join(" ");
            tracing::debug!(%phrase, symptom = span.symptom, "Exact symptom match");
            out.record(phrase, span.symptom, MatchKind::Exact);
            covered[span.start..span.end()].fill(true);
        }

        for run in self.fuzzy_runs(words, &covered) {
            self.match_fuzzy_run(&run, out);
        }
    }

    /// Maximal runs of uncovered words, split at conjunctions and fillers.
    fn fuzzy_runs<'a>(&self, words: &'a [String], covered: &[bool]) -> Vec<Vec<&'a str>> {
        let mut runs = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        for (word, &is_covered) in words.iter().zip(covered) {
            let skip = is_covered || self.conjunctions.contains(word) || self.fillers.contains(word);
            if skip {
                if !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
            } else {
                run.push(word);
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }
        runs
    }

    fn match_fuzzy_run(&self, run: &[&str], out: &mut NormalizedSymptoms) {
        let joined_len = run.iter().map(|w| w.chars().count()).sum::<usize>() + run.len() - 1;
        if run.len() > 1 && self.fuzzy.can_match_len(joined_len, allowed_distance(joined_len)) {
            let joined = run.join(" ");
            if let Some(hit) = self.fuzzy_lookup(&joined) {
                tracing::debug!(phrase = %joined, matched = %hit.0, "Fuzzy symptom match");
                out.record(joined, hit.1, MatchKind::Fuzzy { distance: hit.2 });
                return;
            }
        }
        for word in run {
            if let Some(hit) = self.fuzzy_lookup(word) {
                tracing::debug!(phrase = %word, matched = %hit.0, "Fuzzy symptom match");
                out.record(word.to_string(), hit.1, MatchKind::Fuzzy { distance: hit.2 });
            }
        }
    }

    fn fuzzy_lookup(&self, text: &str) -> Option<(String, SymptomId, usize)> {
        let len = text.chars().count();
        if len < self.fuzzy_min_len {
            return None;
        }
        self.fuzzy
            .lookup(text, allowed_distance(len))
            .filter(|hit| hit.distance > 0)
            .map(|hit| (hit.phrase, hit.symptom, hit.distance))
    }
}

/// Edit budget for a fuzzy candidate of `len` chars.
fn allowed_distance(len: usize) -> usize {
    if len >= 8 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> SymptomVocabulary {
        SymptomVocabulary::new([
            "chest_pain",
            "muscle_pain",
            "headache",
            "high_fever",
            "skin_rash",
            "blurred_and_distorted_vision",
            "breathlessness",
            "itching",
        ])
        .unwrap()
    }

    fn normalizer() -> (SymptomVocabulary, SymptomNormalizer) {
        let vocab = vocab();
        let mut table = SynonymTable::for_vocabulary(&vocab);
        table
            .add_curated(
                &vocab,
                [
                    ("pain", "muscle_pain"),
                    ("fever", "high_fever"),
                    ("rash", "skin_rash"),
                    ("shortness of breath", "breathlessness"),
                    ("blurred vision", "blurred_and_distorted_vision"),
                ],
            )
            .unwrap();
        let n = SymptomNormalizer::new(&table, &NormalizerConfig::default());
        (vocab, n)
    }

    fn names(vocab: &SymptomVocabulary, n: &NormalizedSymptoms) -> Vec<String> {
        n.symptoms.iter().map(|&id| vocab.name(id).unwrap().to_string()).collect()
    }

    #[test]
    fn splits_words_and_clauses() {
        let delims: HashSet<char> = ",".chars().collect();
        let clauses = split_clauses("I've got Chest-Pain, and a RASH", &delims);
        assert_eq!(clauses, vec![vec!["ive", "got", "chest", "pain"], vec!["and", "a", "rash"]]);
    }

    #[test]
    fn canonical_identifier_maps_to_itself() {
        let (vocab, n) = normalizer();
        for (id, name) in vocab.names().iter().enumerate() {
            assert!(n.normalize(name).symptoms.contains(&id), "{name}");
        }
    }

    #[test]
    fn longest_match_beats_nested_pain() {
        let (vocab, n) = normalizer();
        let result = n.normalize("chest pain");
        assert_eq!(names(&vocab, &result), vec!["chest_pain"]);
    }

    #[test]
    fn standalone_pain_still_maps() {
        let (vocab, n) = normalizer();
        let result = n.normalize("pain in my legs");
        assert_eq!(names(&vocab, &result), vec!["muscle_pain"]);
    }

    #[test]
    fn conjunction_inside_canonical_phrase() {
        let (vocab, n) = normalizer();
        let result = n.normalize("blurred and distorted vision and a rash");
        assert_eq!(
            names(&vocab, &result),
            vec!["skin_rash", "blurred_and_distorted_vision"]
        );
    }

    #[test]
    fn delimiters_stop_cross_clause_phrases() {
        let (vocab, n) = normalizer();
        let result = n.normalize("my chest, pain everywhere");
        assert_eq!(names(&vocab, &result), vec!["muscle_pain"]);
    }

    #[test]
    fn fuzzy_fallback_corrects_typos() {
        let (vocab, n) = normalizer();
        let result = n.normalize("terrible hedache and itchng");
        assert_eq!(names(&vocab, &result), vec!["headache", "itching"]);
        assert!(result
            .matches
            .iter()
            .all(|m| matches!(m.kind, MatchKind::Fuzzy { distance: 1 })));
    }

    #[test]
    fn long_unmatched_message_returns_quickly() {
        let (_, n) = normalizer();
        let text = "zzzzz ".repeat(340);
        assert!(text.len() > 2000);
        let started = std::time::Instant::now();
        let result = n.normalize(&text);
        assert!(result.symptoms.is_empty());
        assert!(started.elapsed() < std::time::Duration::from_secs(1), "{:?}", started.elapsed());
    }

    #[test]
    fn long_run_still_fuzzes_each_word() {
        let (vocab, n) = normalizer();
        let text = format!("{}hedache", "zzzzz ".repeat(340));
        let result = n.normalize(&text);
        assert_eq!(names(&vocab, &result), vec!["headache"]);
    }

    #[test]
    fn fillers_are_not_fuzzed() {
        let (_, n) = normalizer();
        let result = n.normalize("I have been feeling really quite bad");
        assert!(result.symptoms.is_empty());
        assert_eq!(result.recognition(), Recognition::Unrecognized);
    }

    #[test]
    fn empty_text_is_distinguished() {
        let (_, n) = normalizer();
        let empty = n.normalize("   ");
        assert!(empty.empty_input);
        assert_eq!(empty.recognition(), Recognition::EmptyInput);
        let unknown = n.normalize("xyz");
        assert!(!unknown.empty_input);
        assert_eq!(unknown.recognition(), Recognition::Unrecognized);
    }

    #[test]
    fn duplicates_collapse_in_set() {
        let (_, n) = normalizer();
        let result = n.normalize("fever, high fever, fever");
        assert_eq!(result.symptoms.len(), 1);
        assert_eq!(result.matches.len(), 3);
    }

    #[test]
    fn phrase_list_input() {
        let (vocab, n) = normalizer();
        let result = n.normalize_phrases(&["shortness of breath", "Fever"]);
        assert_eq!(names(&vocab, &result), vec!["high_fever", "breathlessness"]);
        assert!(n.normalize_phrases::<&str>(&[]).empty_input);
    }

    #[test]
    fn unknown_synonym_target_rejected() {
        let vocab = vocab();
        let mut table = SynonymTable::for_vocabulary(&vocab);
        let err = table.add_curated(&vocab, [("tummy ache", "stomach_pain")]).unwrap_err();
        assert!(matches!(err, LoadError::UnknownSynonymTarget { .. }));
    }

    #[test]
    fn synonym_lookup_uses_normalized_key() {
        let vocab = vocab();
        let table = SynonymTable::for_vocabulary(&vocab);
        assert_eq!(table.get("Skin  Rash"), vocab.id_of("skin_rash"));
        assert_eq!(table.get("skin_rash"), vocab.id_of("skin_rash"));
    }
}
