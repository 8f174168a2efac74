//! Error families for the prediction core.
//!
//! `LoadError` is fatal and only produced while tables and the model artifact
//! are being assembled. `ValidationError` is returned to the caller of a
//! prediction and never leaves the engine in a different state.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path} line {line}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Dataset {0} contains no usable records")]
    EmptyDataset(PathBuf),

    #[error("Duplicate {kind} '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("Disease labels '{first}' and '{second}' differ only by case or spacing")]
    NearDuplicateLabel { first: String, second: String },

    #[error("Synonym '{phrase}' points at '{symptom}', which is not in the symptom vocabulary")]
    UnknownSynonymTarget { phrase: String, symptom: String },

    #[error("{table} keys disagree with the disease labels (missing: {missing:?}, orphaned: {orphaned:?})")]
    KeyspaceMismatch {
        table: &'static str,
        missing: Vec<String>,
        orphaned: Vec<String>,
    },

    #[error("Model expects {model} {what} but the artifact lists {listed}")]
    ArtifactMismatch {
        what: &'static str,
        model: usize,
        listed: usize,
    },

    #[error("Artifact {what} do not match the dataset (first difference at index {index})")]
    VersionMismatch { what: &'static str, index: usize },

    #[error("Unsupported model artifact format version {found} (expected {expected})")]
    UnsupportedArtifact { found: u32, expected: u32 },

    #[error("Model artifact {0} not found and training on load is disabled")]
    ModelMissing(PathBuf),

    #[error("Artifact encoding error: {0}")]
    Artifact(#[from] bincode::Error),

    #[error("Configuration error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Training failed: {0}")]
    Training(#[from] TrainError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrainError {
    #[error("No records with at least {0} symptoms")]
    NoTrainingRecords(usize),

    #[error("Need at least 2 disease classes, found {0}")]
    TooFewClasses(usize),

    #[error("Invalid training parameter: {0}")]
    InvalidParameter(String),
}

/// Caller-recoverable errors returned from a prediction request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(usize),

    #[error("No symptom phrases were supplied")]
    EmptyInput,

    #[error("Feature vector has {actual} entries, classifier expects {expected}")]
    FeatureLength { expected: usize, actual: usize },
}

pub type LoadResult<T> = Result<T, LoadError>;
