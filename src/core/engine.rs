// File: src/core/engine.rs
use crate::config::EngineConfig;
use crate::core::classifier::{DiseaseClassifier, DiseaseModel};
use crate::core::encoder::FeatureEncoder;
use crate::core::knowledge::{DiseaseKnowledge, KnowledgeEntry};
use crate::core::normalizer::{NormalizedSymptoms, SymptomNormalizer, SynonymTable};
use crate::core::types::{
    ConfidenceBand, DiseaseProfiles, Prediction, PredictionResult, ProfileMatch, Recognition,
    ScoredDisease, SymptomId,
};
use crate::core::vocabulary::{DiseaseLabelSet, SymptomVocabulary};
use crate::dataset::MedicalTables;
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::persistence::{load_bundle, save_bundle, ModelBundle};
use crate::training::train_bundle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What to do when no symptom is recognized in the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySymptomPolicy {
    /// Return no predictions; `recognition` tells the caller why.
    #[default]
    ShortCircuit,
    /// Run the classifier on the all-zero vector and return its prior.
    ClassifierPrior,
}

/// The assembled prediction pipeline: normalizer, encoder, classifier and
/// knowledge base, all read-only after construction.
#[derive(Debug)]
pub struct PredictionEngine {
    vocabulary: SymptomVocabulary,
    normalizer: SymptomNormalizer,
    encoder: FeatureEncoder,
    classifier: DiseaseClassifier,
    knowledge: DiseaseKnowledge,
    profiles: DiseaseProfiles,
    default_top_k: usize,
    empty_policy: EmptySymptomPolicy,
}

impl PredictionEngine {
    /// Loads the tables, then loads the model bundle or trains one when it is
    /// missing and `train_if_missing` is set.
    pub fn from_config(config: &EngineConfig) -> LoadResult<Self> {
        let tables = MedicalTables::load(&config.data)?;
        let bundle = if config.model_path.exists() {
            load_bundle(&config.model_path)?
        } else if config.train_if_missing {
            tracing::info!(path = %config.model_path.display(), "No model bundle found, training one");
            let bundle = train_bundle(&tables.dataset, &config.forest, &config.training)?;
            save_bundle(&bundle, &config.model_path)?;
            bundle
        } else {
            return Err(LoadError::ModelMissing(config.model_path.clone()));
        };
        Self::assemble(tables, bundle, config)
    }

    /// Builds the engine from loaded tables and a bundle. The bundle must
    /// have been trained on exactly this dataset's symptoms and labels.
    pub fn assemble(tables: MedicalTables, bundle: ModelBundle, config: &EngineConfig) -> LoadResult<Self> {
        bundle.validate()?;
        check_same_order("symptoms", &bundle.symptoms, tables.dataset.vocabulary().names())?;
        check_same_order("disease labels", &bundle.diseases, tables.dataset.labels().names())?;

        Self::from_parts(
            tables.dataset.vocabulary().clone(),
            tables.dataset.labels().clone(),
            Box::new(bundle.forest),
            tables.knowledge,
            tables.dataset.disease_profiles(),
            &tables.synonyms,
            config,
        )
    }

    /// Lowest-level constructor; any `DiseaseModel` can stand in for the forest.
    /// Diseases absent from `profiles` report an empty symptom match.
    pub fn from_parts(
        vocabulary: SymptomVocabulary,
        labels: DiseaseLabelSet,
        model: Box<dyn DiseaseModel>,
        knowledge: DiseaseKnowledge,
        profiles: DiseaseProfiles,
        curated_synonyms: &[(String, String)],
        config: &EngineConfig,
    ) -> LoadResult<Self> {
        if config.default_top_k == 0 {
            return Err(LoadError::InvalidConfig("default_top_k must be at least 1".into()));
        }
        knowledge.validate_against(&labels)?;
        check_profiles(&profiles, labels.len(), vocabulary.len())?;

        let classifier = DiseaseClassifier::new(model, labels)?;
        if classifier.n_features() != vocabulary.len() {
            return Err(LoadError::ArtifactMismatch {
                what: "symptoms",
                model: classifier.n_features(),
                listed: vocabulary.len(),
            });
        }

        let mut synonyms = SynonymTable::for_vocabulary(&vocabulary);
        synonyms.add_curated(&vocabulary, curated_synonyms.iter().map(|(p, s)| (p, s)))?;
        let normalizer = SymptomNormalizer::new(&synonyms, &config.normalizer);
        let encoder = FeatureEncoder::new(&vocabulary);

        tracing::info!(
            symptoms = vocabulary.len(),
            diseases = classifier.labels().len(),
            phrases = normalizer.phrase_count(),
            descriptions = knowledge.description_count(),
            precautions = knowledge.precaution_count(),
            policy = ?config.empty_policy,
            "Prediction engine ready"
        );
        Ok(Self {
            vocabulary,
            normalizer,
            encoder,
            classifier,
            knowledge,
            profiles,
            default_top_k: config.default_top_k,
            empty_policy: config.empty_policy,
        })
    }

    /// Free text in, ranked predictions out. Empty text is not an error; it
    /// comes back with `Recognition::EmptyInput`.
    pub fn predict_from_text(&self, text: &str, top_k: usize) -> Result<PredictionResult, ValidationError> {
        validate_top_k(top_k)?;
        let normalized = self.normalizer.normalize(text);
        self.rank(normalized, top_k)
    }

    /// `predict_from_text` with the configured default `top_k`.
    pub fn predict(&self, text: &str) -> Result<PredictionResult, ValidationError> {
        self.predict_from_text(text, self.default_top_k)
    }

    /// Structured input: each phrase is matched on its own.
    pub fn predict_from_symptoms<S: AsRef<str>>(
        &self,
        phrases: &[S],
        top_k: usize,
    ) -> Result<PredictionResult, ValidationError> {
        validate_top_k(top_k)?;
        if phrases.iter().all(|p| p.as_ref().trim().is_empty()) {
            return Err(ValidationError::EmptyInput);
        }
        let normalized = self.normalizer.normalize_phrases(phrases);
        self.rank(normalized, top_k)
    }

    pub fn normalize(&self, text: &str) -> NormalizedSymptoms {
        self.normalizer.normalize(text)
    }

    /// Canonical names for a normalized set, in vocabulary order.
    pub fn symptom_names(&self, normalized: &NormalizedSymptoms) -> Vec<String> {
        normalized
            .symptoms
            .iter()
            .filter_map(|&id| self.vocabulary.name(id))
            .map(str::to_string)
            .collect()
    }

    pub fn lookup(&self, disease: &str) -> KnowledgeEntry {
        self.knowledge.lookup(disease)
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &DiseaseLabelSet {
        self.classifier.labels()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn empty_policy(&self) -> EmptySymptomPolicy {
        self.empty_policy
    }

    fn rank(&self, normalized: NormalizedSymptoms, top_k: usize) -> Result<PredictionResult, ValidationError> {
        let recognition = normalized.recognition();
        let detected_symptoms = self.symptom_names(&normalized);

        if normalized.is_empty() {
            if recognition == Recognition::Unrecognized {
                tracing::warn!("No symptoms recognized in input");
            }
            if self.empty_policy == EmptySymptomPolicy::ShortCircuit {
                return Ok(PredictionResult {
                    recognition,
                    detected_symptoms,
                    predictions: Vec::new(),
                });
            }
        }

        let vector = self.encoder.encode(&normalized.symptoms);
        let predictions = self
            .classifier
            .predict(&vector)?
            .into_iter()
            .take(top_k)
            .map(|scored| self.enrich(scored, &normalized.symptoms))
            .collect();

        Ok(PredictionResult {
            recognition,
            detected_symptoms,
            predictions,
        })
    }

    fn enrich(&self, scored: ScoredDisease, detected: &BTreeSet<SymptomId>) -> Prediction {
        let entry = self.knowledge.lookup(&scored.disease);
        if entry.description.is_none() || entry.precautions.is_empty() {
            tracing::warn!(disease = %scored.disease, "Knowledge missing for predicted disease");
        }
        let symptom_match = self
            .labels()
            .id_of(&scored.disease)
            .and_then(|id| self.profiles.get(&id))
            .map(|profile| ProfileMatch::between(detected, profile))
            .unwrap_or_default();
        Prediction {
            band: ConfidenceBand::from_confidence(scored.probability),
            confidence: scored.probability,
            disease: scored.disease,
            description: entry.description,
            precautions: entry.precautions,
            symptom_match,
        }
    }
}

fn validate_top_k(top_k: usize) -> Result<(), ValidationError> {
    if top_k == 0 {
        Err(ValidationError::InvalidTopK(top_k))
    } else {
        Ok(())
    }
}

/// Profile keys must be known labels and profile members known symptoms.
fn check_profiles(profiles: &DiseaseProfiles, n_labels: usize, n_symptoms: usize) -> LoadResult<()> {
    if let Some(&disease) = profiles.keys().find(|&&d| d >= n_labels) {
        return Err(LoadError::ArtifactMismatch {
            what: "profile diseases",
            model: disease + 1,
            listed: n_labels,
        });
    }
    if let Some(&symptom) = profiles.values().flatten().find(|&&s| s >= n_symptoms) {
        return Err(LoadError::ArtifactMismatch {
            what: "profile symptoms",
            model: symptom + 1,
            listed: n_symptoms,
        });
    }
    Ok(())
}

/// Bundle names must equal the dataset's, position by position.
fn check_same_order(what: &'static str, bundle: &[String], dataset: &[String]) -> LoadResult<()> {
    let first_diff = bundle
        .iter()
        .zip(dataset)
        .position(|(a, b)| a != b)
        .or_else(|| (bundle.len() != dataset.len()).then(|| bundle.len().min(dataset.len())));
    match first_diff {
        None => Ok(()),
        Some(index) => Err(LoadError::VersionMismatch { what, index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores each disease by how many of its two marker symptoms are present.
    #[derive(Debug)]
    struct MarkerModel;

    impl DiseaseModel for MarkerModel {
        fn n_features(&self) -> usize {
            4
        }
        fn n_classes(&self) -> usize {
            2
        }
        fn predict_proba(&self, f: &[f64]) -> Vec<f64> {
            vec![0.1 + f[0] + f[1], 0.1 + f[2] + f[3]]
        }
    }

    fn vocab() -> SymptomVocabulary {
        SymptomVocabulary::new(["chills", "high_fever", "headache", "nausea"]).unwrap()
    }

    fn labels() -> DiseaseLabelSet {
        DiseaseLabelSet::new(["Malaria", "Migraine"]).unwrap()
    }

    fn knowledge() -> DiseaseKnowledge {
        DiseaseKnowledge::new(
            [
                ("Malaria".to_string(), "Parasitic infection.".to_string()),
                ("Migraine".to_string(), "Recurring headaches.".to_string()),
            ],
            [
                ("Malaria".to_string(), vec!["Consult nearest hospital".to_string()]),
                ("Migraine".to_string(), vec!["Rest in a dark room".to_string()]),
            ],
        )
    }

    /// Malaria: chills, high_fever. Migraine: headache, nausea.
    fn profiles() -> DiseaseProfiles {
        DiseaseProfiles::from([(0, BTreeSet::from([0, 1])), (1, BTreeSet::from([2, 3]))])
    }

    fn engine_with(config: &EngineConfig) -> PredictionEngine {
        let synonyms = vec![("fever".to_string(), "high_fever".to_string())];
        PredictionEngine::from_parts(
            vocab(),
            labels(),
            Box::new(MarkerModel),
            knowledge(),
            profiles(),
            &synonyms,
            config,
        )
        .unwrap()
    }

    fn engine() -> PredictionEngine {
        engine_with(&EngineConfig::default())
    }

    #[test]
    fn ranks_and_enriches() {
        let result = engine().predict_from_text("Fever and chills since Monday", 2).unwrap();
        assert_eq!(result.recognition, Recognition::Recognized);
        assert_eq!(result.detected_symptoms, vec!["chills", "high_fever"]);
        assert_eq!(result.predictions.len(), 2);
        let top = &result.predictions[0];
        assert_eq!(top.disease, "Malaria");
        assert_eq!(top.description.as_deref(), Some("Parasitic infection."));
        assert!((top.confidence - 2.1 / 2.2).abs() < 1e-12);
        assert_eq!(top.band, ConfidenceBand::VeryHigh);
        assert!(result.predictions[0].confidence >= result.predictions[1].confidence);
    }

    #[test]
    fn predictions_report_profile_overlap() {
        let result = engine().predict_from_text("fever, chills and nausea", 2).unwrap();
        let malaria = &result.predictions[0];
        assert_eq!(malaria.disease, "Malaria");
        assert_eq!(malaria.symptom_match.matched, 2);
        assert!((malaria.symptom_match.coverage - 1.0).abs() < 1e-12);
        assert!((malaria.symptom_match.precision - 2.0 / 3.0).abs() < 1e-12);
        let migraine = &result.predictions[1];
        assert_eq!(migraine.symptom_match.matched, 1);
        assert!((migraine.symptom_match.coverage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn top_k_truncates_and_zero_is_rejected() {
        let e = engine();
        assert_eq!(e.predict_from_text("nausea", 1).unwrap().predictions.len(), 1);
        assert_eq!(e.predict_from_text("nausea", 0), Err(ValidationError::InvalidTopK(0)));
        assert_eq!(e.predict_from_text("nausea", 10).unwrap().predictions.len(), 2);
    }

    #[test]
    fn empty_text_short_circuits_without_error() {
        let result = engine().predict_from_text("   ", 3).unwrap();
        assert_eq!(result.recognition, Recognition::EmptyInput);
        assert!(result.predictions.is_empty());

        let result = engine().predict_from_text("nothing useful here", 3).unwrap();
        assert_eq!(result.recognition, Recognition::Unrecognized);
        assert!(result.no_symptoms_recognized());
    }

    #[test]
    fn prior_policy_runs_classifier_on_zero_vector() {
        let config = EngineConfig {
            empty_policy: EmptySymptomPolicy::ClassifierPrior,
            ..EngineConfig::default()
        };
        let result = engine_with(&config).predict_from_text("", 3).unwrap();
        assert_eq!(result.recognition, Recognition::EmptyInput);
        assert_eq!(result.predictions.len(), 2);
        // Equal prior: alphabetical order.
        assert_eq!(result.predictions[0].disease, "Malaria");
        assert!((result.predictions[0].confidence - 0.5).abs() < 1e-12);
        assert_eq!(result.predictions[0].symptom_match, ProfileMatch::default());
    }

    #[test]
    fn structured_input() {
        let e = engine();
        let result = e.predict_from_symptoms(&["headache", "Nausea"], 1).unwrap();
        assert_eq!(result.top().unwrap().disease, "Migraine");
        assert_eq!(e.predict_from_symptoms::<&str>(&[], 3), Err(ValidationError::EmptyInput));
        assert_eq!(e.predict_from_symptoms(&[" ", ""], 3), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn load_checks_fail_fast() {
        let config = EngineConfig::default();
        let partial = DiseaseKnowledge::new(
            [("Malaria".to_string(), "x".to_string())],
            [("Malaria".to_string(), vec!["y".to_string()])],
        );
        let err = PredictionEngine::from_parts(vocab(), labels(), Box::new(MarkerModel), partial, profiles(), &[], &config)
            .unwrap_err();
        assert!(matches!(err, LoadError::KeyspaceMismatch { .. }));

        let short_vocab = SymptomVocabulary::new(["chills", "high_fever"]).unwrap();
        let err = PredictionEngine::from_parts(short_vocab, labels(), Box::new(MarkerModel), knowledge(), profiles(), &[], &config)
            .unwrap_err();
        assert!(matches!(err, LoadError::ArtifactMismatch { what: "symptoms", .. }));

        let bad_synonym = vec![("sneeze".to_string(), "sneezing".to_string())];
        let err = PredictionEngine::from_parts(vocab(), labels(), Box::new(MarkerModel), knowledge(), profiles(), &bad_synonym, &config)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnknownSynonymTarget { .. }));

        let stray = DiseaseProfiles::from([(2, BTreeSet::from([0]))]);
        let err = PredictionEngine::from_parts(vocab(), labels(), Box::new(MarkerModel), knowledge(), stray, &[], &config)
            .unwrap_err();
        assert!(matches!(err, LoadError::ArtifactMismatch { what: "profile diseases", .. }));
    }

    #[test]
    fn order_check_reports_first_difference() {
        let a = vec!["a".to_string(), "b".to_string()];
        let b = vec!["a".to_string(), "c".to_string()];
        assert!(matches!(
            check_same_order("symptoms", &a, &b),
            Err(LoadError::VersionMismatch { index: 1, .. })
        ));
        assert!(matches!(
            check_same_order("symptoms", &a, &a[..1]),
            Err(LoadError::VersionMismatch { index: 1, .. })
        ));
        assert!(check_same_order("symptoms", &a, &a).is_ok());
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PredictionEngine>();
    }
}
