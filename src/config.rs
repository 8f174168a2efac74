// File: src/config.rs
use crate::core::engine::EmptySymptomPolicy;
use crate::core::normalizer::NormalizerConfig;
use crate::dataset::DataSources;
use crate::error::{LoadError, LoadResult};
use crate::model::ForestParams;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "Symptom Checker";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the directory holding the CSV tables and the model bundle.
pub const DATA_DIR_ENV: &str = "SYMPTOM_CHECKER_DATA_DIR";
/// Overrides the model bundle path alone.
pub const MODEL_PATH_ENV: &str = "SYMPTOM_CHECKER_MODEL";

pub const DEFAULT_MODEL_FILE: &str = "model.bin";

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "warn,symptom_core=info,symptom_engine=info,train_model=info".to_string()
}

/// Everything needed to build a `PredictionEngine`.
/// Every section falls back to its defaults when absent from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data: DataSources,
    pub model_path: PathBuf,
    /// Train and save a bundle when `model_path` does not exist.
    pub train_if_missing: bool,
    pub default_top_k: usize,
    pub empty_policy: EmptySymptomPolicy,
    pub normalizer: NormalizerConfig,
    pub forest: ForestParams,
    pub training: TrainingConfig,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = Path::new("data");
        Self {
            data: DataSources::in_dir(data_dir),
            model_path: data_dir.join(DEFAULT_MODEL_FILE),
            train_if_missing: true,
            default_top_k: 3,
            empty_policy: EmptySymptomPolicy::default(),
            normalizer: NormalizerConfig::default(),
            forest: ForestParams::default(),
            training: TrainingConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LoadError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Points every table and the bundle at the conventional names in `dir`.
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.data = DataSources::in_dir(dir);
        self.model_path = dir.join(DEFAULT_MODEL_FILE);
        self
    }

    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup. The data directory is applied
    /// first so an explicit model path still wins.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%dir, "Data directory overridden from environment");
            self = self.with_data_dir(Path::new(dir.trim()));
        }
        if let Some(model) = lookup(MODEL_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%model, "Model path overridden from environment");
            self.model_path = PathBuf::from(model.trim());
        }
        self
    }
}
