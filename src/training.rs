// File: src/training.rs
use crate::core::classifier::DiseaseModel;
use crate::core::encoder::FeatureEncoder;
use crate::core::types::DiseaseId;
use crate::dataset::SymptomDataset;
use crate::error::TrainError;
use crate::model::{ForestParams, RandomForest};
use crate::persistence::ModelBundle;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Share of each class held out for the accuracy report.
    pub holdout_fraction: f64,
    /// Records with fewer symptoms carry too little signal and are skipped.
    pub min_symptoms_per_record: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            min_symptoms_per_record: 2,
        }
    }
}

/// Summary stored alongside the trained forest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub records_total: usize,
    pub records_used: usize,
    pub train_samples: usize,
    pub holdout_samples: usize,
    /// `None` when nothing was held out.
    pub holdout_accuracy: Option<f64>,
    pub n_trees: usize,
    pub seed: u64,
}

/// Trains a forest on the dataset and packages it with the vocabulary and
/// labels it was trained against.
pub fn train_bundle(
    dataset: &SymptomDataset,
    params: &ForestParams,
    config: &TrainingConfig,
) -> Result<ModelBundle, TrainError> {
    if !(0.0..1.0).contains(&config.holdout_fraction) {
        return Err(TrainError::InvalidParameter(format!(
            "holdout_fraction must be in [0, 1), got {}",
            config.holdout_fraction
        )));
    }

    let encoder = FeatureEncoder::new(dataset.vocabulary());
    let usable: Vec<(Vec<f64>, DiseaseId)> = dataset
        .records()
        .iter()
        .filter(|r| r.symptoms.len() >= config.min_symptoms_per_record)
        .map(|r| (encoder.encode(&r.symptoms).as_slice().to_vec(), r.disease))
        .collect();
    if usable.is_empty() {
        return Err(TrainError::NoTrainingRecords(config.min_symptoms_per_record));
    }

    let (train_idx, holdout_idx) = stratified_split(&usable, config.holdout_fraction, params.seed);
    let classes = train_idx
        .iter()
        .map(|&i| usable[i].1)
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    if classes < 2 {
        return Err(TrainError::TooFewClasses(classes));
    }

    let rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| usable[i].0.clone()).collect();
    let targets: Vec<usize> = train_idx.iter().map(|&i| usable[i].1).collect();
    let forest = RandomForest::fit(&rows, &targets, dataset.labels().len(), params)?;

    let holdout_accuracy = (!holdout_idx.is_empty()).then(|| {
        let correct = holdout_idx
            .iter()
            .filter(|&&i| argmax(&forest.predict_proba(&usable[i].0)) == usable[i].1)
            .count();
        correct as f64 / holdout_idx.len() as f64
    });

    let report = TrainingReport {
        records_total: dataset.records().len(),
        records_used: usable.len(),
        train_samples: train_idx.len(),
        holdout_samples: holdout_idx.len(),
        holdout_accuracy,
        n_trees: params.n_trees,
        seed: params.seed,
    };
    tracing::info!(
        records_used = report.records_used,
        skipped = report.records_total - report.records_used,
        train = report.train_samples,
        holdout = report.holdout_samples,
        accuracy = ?report.holdout_accuracy,
        "Trained disease classifier"
    );

    Ok(ModelBundle::new(
        dataset.vocabulary().names().to_vec(),
        dataset.labels().names().to_vec(),
        forest,
        report,
    ))
}

/// Per-class seeded shuffle, holding out `round(n * fraction)` of each class
/// while always keeping at least one sample of the class for training.
fn stratified_split(samples: &[(Vec<f64>, DiseaseId)], fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<DiseaseId, Vec<usize>> = BTreeMap::new();
    for (i, (_, class)) in samples.iter().enumerate() {
        by_class.entry(*class).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut holdout = Vec::new();
    for mut members in by_class.into_values() {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * fraction).round() as usize).min(members.len() - 1);
        holdout.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    holdout.sort_unstable();
    (train, holdout)
}

fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &s)| if s > best.1 { (i, s) } else { best })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> SymptomDataset {
        SymptomDataset::from_rows(vec![
            ("Flu", vec!["fever", "cough", "chills"]),
            ("Flu", vec!["fever", "cough"]),
            ("Flu", vec!["fever", "chills"]),
            ("Flu", vec!["cough", "chills"]),
            ("Flu", vec!["fever"]),
            ("Migraine", vec!["headache", "nausea", "blurred_vision"]),
            ("Migraine", vec!["headache", "nausea"]),
            ("Migraine", vec!["headache", "blurred_vision"]),
            ("Migraine", vec!["nausea", "blurred_vision"]),
        ])
        .unwrap()
    }

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            ..ForestParams::default()
        }
    }

    #[test]
    fn filters_sparse_records_and_reports() {
        let bundle = train_bundle(&dataset(), &params(), &TrainingConfig::default()).unwrap();
        let report = &bundle.report;
        assert_eq!(report.records_total, 9);
        assert_eq!(report.records_used, 8);
        assert_eq!(report.train_samples + report.holdout_samples, 8);
        assert_eq!(report.holdout_samples, 2);
        assert_eq!(bundle.symptoms.len(), 6);
        assert_eq!(bundle.diseases, vec!["Flu", "Migraine"]);
        assert!(bundle.validate().is_ok());
    }

    #[test]
    fn training_is_reproducible() {
        let a = train_bundle(&dataset(), &params(), &TrainingConfig::default()).unwrap();
        let b = train_bundle(&dataset(), &params(), &TrainingConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn no_usable_records() {
        let config = TrainingConfig {
            min_symptoms_per_record: 4,
            ..TrainingConfig::default()
        };
        assert_eq!(
            train_bundle(&dataset(), &params(), &config),
            Err(TrainError::NoTrainingRecords(4))
        );
    }

    #[test]
    fn rejects_bad_holdout() {
        let config = TrainingConfig {
            holdout_fraction: 1.0,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            train_bundle(&dataset(), &params(), &config),
            Err(TrainError::InvalidParameter(_))
        ));
    }

    #[test]
    fn split_keeps_every_class_in_training() {
        let samples: Vec<(Vec<f64>, DiseaseId)> = vec![(vec![], 0), (vec![], 1), (vec![], 1)];
        let (train, holdout) = stratified_split(&samples, 0.5, 1);
        assert!(train.contains(&0));
        assert_eq!(train.len() + holdout.len(), 3);
    }
}
