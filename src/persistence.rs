// File: src/persistence.rs
use crate::core::classifier::DiseaseModel;
use crate::error::{LoadError, LoadResult};
use crate::model::RandomForest;
use crate::training::TrainingReport;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Bumped whenever the bundle layout changes.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// The trained artifact: vocabulary, labels and model travel together so
/// they can never be mixed across training runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    /// Feature order the forest was trained on.
    pub symptoms: Vec<String>,
    /// Class order of the forest's output.
    pub diseases: Vec<String>,
    pub forest: RandomForest,
    pub report: TrainingReport,
}

impl ModelBundle {
    pub fn new(symptoms: Vec<String>, diseases: Vec<String>, forest: RandomForest, report: TrainingReport) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            symptoms,
            diseases,
            forest,
            report,
        }
    }

    /// Checks the version and that the listed names match the model's shape.
    pub fn validate(&self) -> LoadResult<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(LoadError::UnsupportedArtifact {
                found: self.format_version,
                expected: BUNDLE_FORMAT_VERSION,
            });
        }
        if self.forest.n_features() != self.symptoms.len() {
            return Err(LoadError::ArtifactMismatch {
                what: "symptoms",
                model: self.forest.n_features(),
                listed: self.symptoms.len(),
            });
        }
        if self.forest.n_classes() != self.diseases.len() {
            return Err(LoadError::ArtifactMismatch {
                what: "classes",
                model: self.forest.n_classes(),
                listed: self.diseases.len(),
            });
        }
        Ok(())
    }
}

/// Writes through a temp file in the destination directory and renames it
/// into place, so a reader never sees a half-written bundle.
pub fn save_bundle(bundle: &ModelBundle, path: &Path) -> LoadResult<()> {
    let io_err = |source: std::io::Error| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir).map_err(io_err)?;

    let temp_file = NamedTempFile::new_in(parent_dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        bincode::serialize_into(&mut writer, bundle)?;
        writer.flush().map_err(io_err)?;
    }
    temp_file.persist(path).map_err(|e| io_err(e.error))?;

    tracing::info!(
        path = %path.display(),
        symptoms = bundle.symptoms.len(),
        diseases = bundle.diseases.len(),
        trees = bundle.forest.tree_count(),
        "Saved model bundle"
    );
    Ok(())
}

pub fn load_bundle(path: &Path) -> LoadResult<ModelBundle> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle: ModelBundle = bincode::deserialize_from(BufReader::new(file))?;
    bundle.validate()?;
    tracing::info!(
        path = %path.display(),
        symptoms = bundle.symptoms.len(),
        diseases = bundle.diseases.len(),
        "Loaded model bundle"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForestParams;

    fn bundle() -> ModelBundle {
        let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let params = ForestParams {
            n_trees: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &[0, 1, 0, 1], 2, &params).unwrap();
        ModelBundle::new(
            vec!["cough".into(), "fever".into()],
            vec!["Cold".into(), "Flu".into()],
            forest,
            TrainingReport::default(),
        )
    }

    #[test]
    fn save_then_load_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.bin");
        let original = bundle();
        save_bundle(&original, &path).unwrap();
        assert_eq!(load_bundle(&path).unwrap(), original);
    }

    #[test]
    fn rejects_other_format_versions() {
        let mut b = bundle();
        b.format_version = 99;
        assert!(matches!(
            b.validate(),
            Err(LoadError::UnsupportedArtifact { found: 99, .. })
        ));
    }

    #[test]
    fn rejects_count_mismatch() {
        let mut b = bundle();
        b.diseases.push("Extra".into());
        assert!(matches!(
            b.validate(),
            Err(LoadError::ArtifactMismatch { what: "classes", model: 2, listed: 3 })
        ));
    }

    #[test]
    fn garbage_file_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"not a bundle").unwrap();
        assert!(load_bundle(&path).is_err());
    }
}
