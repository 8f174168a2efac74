// File: src/dataset.rs
//! CSV loaders for the medical tables.
//!
//! The disease/symptom table comes in two layouts: a symptom list
//! (`Disease, Symptom_1..Symptom_17`, cells often space-padded) and a binary
//! matrix (one 0/1 column per symptom plus a `prognosis` or `Disease` label
//! column). Both produce the same `SymptomDataset`.

use crate::core::knowledge::DiseaseKnowledge;
use crate::core::types::{DiseaseId, DiseaseProfiles, SymptomId};
use crate::core::vocabulary::{DiseaseLabelSet, SymptomVocabulary};
use crate::error::{LoadError, LoadResult};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

const LABEL_COLUMNS: [&str; 2] = ["prognosis", "disease"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetLayout {
    SymptomList,
    BinaryMatrix,
}

/// One row of the dataset, resolved against the vocabulary and labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseRecord {
    pub disease: DiseaseId,
    pub symptoms: BTreeSet<SymptomId>,
}

#[derive(Debug, Clone)]
pub struct SymptomDataset {
    layout: DatasetLayout,
    records: Vec<DiseaseRecord>,
    vocabulary: SymptomVocabulary,
    labels: DiseaseLabelSet,
}

impl SymptomDataset {
    pub fn load(path: &Path) -> LoadResult<Self> {
        let mut reader = open_csv(path)?;
        let headers = reader
            .headers()
            .map_err(|source| csv_error(path, source))?
            .clone();

        let is_list = headers.iter().any(|h| h.trim().starts_with("Symptom_"));
        let dataset = if is_list {
            Self::load_list(path, &headers, &mut reader)?
        } else {
            Self::load_matrix(path, &headers, &mut reader)?
        };
        if dataset.records.is_empty() {
            return Err(LoadError::EmptyDataset(path.to_path_buf()));
        }

        tracing::info!(
            path = %path.display(),
            layout = ?dataset.layout,
            rows = dataset.records.len(),
            symptoms = dataset.vocabulary.len(),
            diseases = dataset.labels.len(),
            "Loaded symptom dataset"
        );
        Ok(dataset)
    }

    /// Builds a list-layout dataset from in-memory `(disease, symptoms)` rows.
    pub fn from_rows<I, D, S>(rows: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = (D, Vec<S>)>,
        D: AsRef<str>,
        S: AsRef<str>,
    {
        let raw: Vec<(String, Vec<String>)> = rows
            .into_iter()
            .map(|(d, symptoms)| {
                let symptoms = symptoms
                    .iter()
                    .map(|s| s.as_ref().trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                (d.as_ref().trim().to_string(), symptoms)
            })
            .collect();
        if raw.is_empty() {
            return Err(LoadError::EmptyDataset(PathBuf::from("<memory>")));
        }
        Self::from_named(DatasetLayout::SymptomList, raw, None)
    }

    fn load_list(path: &Path, headers: &StringRecord, reader: &mut csv::Reader<File>) -> LoadResult<Self> {
        let label_col = label_column(path, headers)?;
        let symptom_cols: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.trim().starts_with("Symptom_"))
            .map(|(i, _)| i)
            .collect();

        let mut raw = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|source| csv_error(path, source))?;
            let disease = required_label(path, &row, label_col)?;
            let symptoms: Vec<String> = symptom_cols
                .iter()
                .filter_map(|&i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            raw.push((disease, symptoms));
        }
        Self::from_named(DatasetLayout::SymptomList, raw, None)
    }

    fn load_matrix(path: &Path, headers: &StringRecord, reader: &mut csv::Reader<File>) -> LoadResult<Self> {
        let label_col = label_column(path, headers)?;
        // Blank headers are export artifacts (trailing index columns).
        let symptom_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|&(i, h)| i != label_col && !h.trim().is_empty())
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();
        let order: Vec<String> = symptom_cols.iter().map(|(_, name)| name.clone()).collect();

        let mut raw = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|source| csv_error(path, source))?;
            let disease = required_label(path, &row, label_col)?;
            let mut symptoms = Vec::new();
            for (col, name) in &symptom_cols {
                match row.get(*col).map(str::trim) {
                    Some("1") | Some("1.0") => symptoms.push(name.clone()),
                    Some("0") | Some("0.0") | Some("") | None => {}
                    Some(other) => {
                        return Err(LoadError::MalformedRow {
                            path: path.to_path_buf(),
                            line: line_of(&row),
                            reason: format!("column '{name}' holds '{other}', expected 0 or 1"),
                        })
                    }
                }
            }
            raw.push((disease, symptoms));
        }
        Self::from_named(DatasetLayout::BinaryMatrix, raw, Some(order))
    }

    fn from_named(
        layout: DatasetLayout,
        raw: Vec<(String, Vec<String>)>,
        column_order: Option<Vec<String>>,
    ) -> LoadResult<Self> {
        let vocabulary = match column_order {
            Some(order) => SymptomVocabulary::new(order)?,
            None => {
                let names: BTreeSet<&str> = raw.iter().flat_map(|(_, s)| s.iter().map(String::as_str)).collect();
                SymptomVocabulary::new(names)?
            }
        };
        let label_names: BTreeSet<&str> = raw.iter().map(|(d, _)| d.as_str()).collect();
        let labels = DiseaseLabelSet::new(label_names)?;

        let records = raw
            .iter()
            .filter_map(|(disease, symptoms)| {
                let disease = labels.id_of(disease)?;
                let symptoms = symptoms.iter().filter_map(|s| vocabulary.id_of(s)).collect();
                Some(DiseaseRecord { disease, symptoms })
            })
            .collect();

        Ok(Self {
            layout,
            records,
            vocabulary,
            labels,
        })
    }

    pub fn layout(&self) -> DatasetLayout {
        self.layout
    }

    pub fn records(&self) -> &[DiseaseRecord] {
        &self.records
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &DiseaseLabelSet {
        &self.labels
    }

    /// Union of the symptoms seen with each disease.
    pub fn disease_profiles(&self) -> DiseaseProfiles {
        let mut profiles = DiseaseProfiles::new();
        for record in &self.records {
            profiles
                .entry(record.disease)
                .or_default()
                .extend(record.symptoms.iter().copied());
        }
        profiles
    }
}

/// `(disease, description)` pairs. Duplicate diseases after trimming are rejected.
pub fn load_descriptions(path: &Path) -> LoadResult<Vec<(String, String)>> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(|source| csv_error(path, source))?.clone();
    let label_col = label_column(path, &headers)?;
    let text_col = find_column(&headers, "description").ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: "Description".to_string(),
    })?;

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let disease = required_label(path, &row, label_col)?;
        reject_duplicate(&mut seen, "description", &disease)?;
        let text = row.get(text_col).unwrap_or_default().trim().to_string();
        rows.push((disease, text));
    }
    Ok(rows)
}

/// `(disease, precautions)` from the `Precaution_*` columns, in column order.
pub fn load_precautions(path: &Path) -> LoadResult<Vec<(String, Vec<String>)>> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(|source| csv_error(path, source))?.clone();
    let label_col = label_column(path, &headers)?;
    let cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.trim().to_ascii_lowercase().starts_with("precaution"))
        .map(|(i, _)| i)
        .collect();
    if cols.is_empty() {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: "Precaution_1".to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let disease = required_label(path, &row, label_col)?;
        reject_duplicate(&mut seen, "precaution", &disease)?;
        let items = cols
            .iter()
            .filter_map(|&i| row.get(i))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        rows.push((disease, items));
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct SynonymRow {
    phrase: String,
    symptom: String,
}

/// Curated `(phrase, symptom)` pairs. Targets are checked later, against
/// the vocabulary, when the synonym table is built.
pub fn load_synonyms(path: &Path) -> LoadResult<Vec<(String, String)>> {
    let mut reader = open_csv(path)?;
    let mut pairs = Vec::new();
    for (i, row) in reader.deserialize::<SynonymRow>().enumerate() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let phrase = row.phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return Err(LoadError::MalformedRow {
                path: path.to_path_buf(),
                line: i as u64 + 2,
                reason: "blank synonym phrase".to_string(),
            });
        }
        pairs.push((phrase, row.symptom.trim().to_string()));
    }
    Ok(pairs)
}

/// Locations of the four input tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSources {
    pub dataset: PathBuf,
    pub descriptions: PathBuf,
    pub precautions: PathBuf,
    /// Curated synonyms; generated identifier entries are always present.
    pub synonyms: Option<PathBuf>,
}

impl Default for DataSources {
    fn default() -> Self {
        Self::in_dir(Path::new("data"))
    }
}

impl DataSources {
    /// The conventional file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dataset: dir.join("dataset.csv"),
            descriptions: dir.join("symptom_Description.csv"),
            precautions: dir.join("symptom_precaution.csv"),
            synonyms: Some(dir.join("symptom_synonyms.csv")),
        }
    }
}

/// Every table the engine needs, loaded but not yet cross-validated.
#[derive(Debug, Clone)]
pub struct MedicalTables {
    pub dataset: SymptomDataset,
    pub knowledge: DiseaseKnowledge,
    pub synonyms: Vec<(String, String)>,
}

impl MedicalTables {
    pub fn load(sources: &DataSources) -> LoadResult<Self> {
        let dataset = SymptomDataset::load(&sources.dataset)?;
        let descriptions = load_descriptions(&sources.descriptions)?;
        let precautions = load_precautions(&sources.precautions)?;
        let synonyms = match &sources.synonyms {
            Some(path) => load_synonyms(path)?,
            None => Vec::new(),
        };
        tracing::info!(
            descriptions = descriptions.len(),
            precautions = precautions.len(),
            synonyms = synonyms.len(),
            "Loaded knowledge tables"
        );
        Ok(Self {
            dataset,
            knowledge: DiseaseKnowledge::new(descriptions, precautions),
            synonyms,
        })
    }
}

fn open_csv(path: &Path) -> LoadResult<csv::Reader<File>> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ReaderBuilder::new().flexible(true).from_reader(file))
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn label_column(path: &Path, headers: &StringRecord) -> LoadResult<usize> {
    LABEL_COLUMNS
        .iter()
        .find_map(|name| find_column(headers, name))
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: "Disease".to_string(),
        })
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map_or(0, |p| p.line())
}

fn required_label(path: &Path, row: &StringRecord, col: usize) -> LoadResult<String> {
    match row.get(col).map(str::trim) {
        Some(label) if !label.is_empty() => Ok(label.to_string()),
        _ => Err(LoadError::MalformedRow {
            path: path.to_path_buf(),
            line: line_of(row),
            reason: "missing disease label".to_string(),
        }),
    }
}

fn reject_duplicate(seen: &mut HashSet<String>, kind: &'static str, key: &str) -> LoadResult<()> {
    if seen.insert(key.to_string()) {
        Ok(())
    } else {
        Err(LoadError::DuplicateKey {
            kind,
            key: key.to_string(),
        })
    }
}
