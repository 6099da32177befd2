//! Retraining controller and the prediction facade exposed to the portal.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::complaints::{
    Category, LabeledExample, Urgency, UrgencyPrediction,
    store::{ComplaintStore, ComplaintStoreError},
};
use crate::corpus;
use crate::estimator;
use crate::ml::metrics::ConfusionMatrix;
use crate::ml::pipeline::{PipelineError, PipelineOptions, TrainedPipeline};
use crate::model_store::{ModelStore, ModelStoreError, TrainingProvenance, TrainingType};
use crate::rules;

/// Minimum merged corpus size for any training pass.
const MIN_TRAINING_EXAMPLES: usize = 10;
/// Above this merged corpus size, a stratified holdout measures accuracy.
const HOLDOUT_THRESHOLD: usize = 20;
/// Fraction of examples held out for the accuracy estimate.
const HOLDOUT_FRACTION: f32 = 0.2;
/// Seed for the stratified holdout shuffle.
const HOLDOUT_SEED: u64 = 42;
/// New real complaints since the last fit that trigger a retrain.
const RETRAIN_DELTA: usize = 10;
/// Real complaints required for the first retrain on real data.
const MIN_REAL_FOR_FIRST_RETRAIN: usize = 5;
/// Reported accuracy when the corpus is too small to hold anything out.
/// A placeholder, not a measurement; carried over from the source system.
const SMALL_CORPUS_ACCURACY: f32 = 0.95;

/// Errors surfaced by retraining. Prediction itself never fails outward.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Complaints(#[from] ComplaintStoreError),
    #[error(transparent)]
    Models(#[from] ModelStoreError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Operational snapshot for dashboards.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub model_exists: bool,
    pub provenance: TrainingProvenance,
}

/// Urgency classification facade: lazy-bootstrapped prediction, keyword
/// overrides, and volume-triggered retraining.
///
/// Prediction reloads persisted state on every call, so a retrain in the same
/// process (or a previous one) is picked up without any cache invalidation.
pub struct TriageEngine<M, C> {
    models: M,
    complaints: C,
    options: PipelineOptions,
    /// Single-flight guard: at most one retrain runs at a time.
    retrain_gate: Mutex<()>,
}

impl<M: ModelStore, C: ComplaintStore> TriageEngine<M, C> {
    pub fn new(models: M, complaints: C) -> Self {
        Self::with_options(models, complaints, PipelineOptions::default())
    }

    pub fn with_options(models: M, complaints: C, options: PipelineOptions) -> Self {
        Self {
            models,
            complaints,
            options,
            retrain_gate: Mutex::new(()),
        }
    }

    /// Classify a new complaint. Always yields a valid tier: pipeline errors
    /// are redirected to the keyword fallback, and every path passes through
    /// the override rules.
    pub fn predict_urgency(&self, description: &str, category: Category) -> Urgency {
        let raw = match self.raw_prediction(description, category) {
            Ok(prediction) => prediction,
            Err(err) => {
                warn!("Urgency pipeline unavailable, using keyword fallback: {err}");
                UrgencyPrediction {
                    label: rules::predict_fallback(description),
                    // The fallback has no probability; full confidence keeps
                    // the low-confidence downgrade rule out of its way.
                    confidence: 1.0,
                }
            }
        };
        rules::apply_overrides(description, category, raw)
    }

    /// String-category variant for the web boundary; unknown categories map
    /// to Other Municipal Issues.
    pub fn predict_urgency_lossy(&self, description: &str, category: &str) -> Urgency {
        let parsed = category.parse::<Category>().unwrap_or_else(|err| {
            warn!("{err}; classifying as {}", Category::OtherMunicipal);
            Category::OtherMunicipal
        });
        self.predict_urgency(description, parsed)
    }

    /// Human-readable expected resolution window. The description is accepted
    /// for interface symmetry but does not influence the estimate.
    pub fn predict_resolution_time(
        &self,
        _description: &str,
        category: Category,
        urgency: Urgency,
    ) -> String {
        estimator::estimate(urgency, category).to_string()
    }

    /// Refit the pipeline on the synthetic corpus plus all labeled history.
    ///
    /// Returns `Ok(false)` when there is too little data; on any failure the
    /// previously persisted pipeline and provenance remain authoritative.
    pub fn retrain(&self) -> Result<bool, TrainError> {
        let _gate = self
            .retrain_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let real = self.complaints.labeled_examples()?;
        let mut merged = corpus::generate();
        let real_count = real.len();
        merged.extend(real);
        info!(
            synthetic = merged.len() - real_count,
            real = real_count,
            "Retraining urgency model"
        );

        if merged.len() < MIN_TRAINING_EXAMPLES {
            warn!(total = merged.len(), "Insufficient data for retraining");
            return Ok(false);
        }

        let (pipeline, accuracy) = self.fit_with_holdout(&merged)?;
        let provenance = TrainingProvenance {
            last_training: now_rfc3339(),
            total_samples: merged.len(),
            real_sample_count: real_count,
            accuracy,
            training_type: TrainingType::Retrain,
            version: "2.0".to_string(),
        };
        self.models.save(&pipeline, &provenance)?;
        info!(accuracy, total = merged.len(), "Urgency model retrained");
        Ok(true)
    }

    /// Volume-based retrain trigger, called after each persisted complaint.
    /// Best-effort: failures are logged, never raised into the caller's
    /// submission flow.
    pub fn train_if_needed(&self) {
        if let Err(err) = self.try_train_if_needed() {
            warn!("Auto-retrain check failed: {err}");
        }
    }

    fn try_train_if_needed(&self) -> Result<(), TrainError> {
        let total = self.complaints.total_count()?;
        // An unreadable provenance record counts as never trained, so the
        // next retrain rewrites it instead of stalling the cadence check.
        let provenance = match self.models.provenance() {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                warn!("Training provenance unreadable, treating as never trained: {err}");
                TrainingProvenance::default()
            }
        };
        let new_complaints = total.saturating_sub(provenance.real_sample_count);

        if new_complaints >= RETRAIN_DELTA {
            info!(new_complaints, "Auto-retraining urgency model");
            self.retrain()?;
        } else if total >= MIN_REAL_FOR_FIRST_RETRAIN
            && provenance.training_type == TrainingType::None
        {
            info!(total, "First training pass over real complaint data");
            self.retrain()?;
        }
        Ok(())
    }

    /// Snapshot of the persisted model state for operational display.
    pub fn model_info(&self) -> ModelInfo {
        let provenance = match self.models.provenance() {
            Ok(Some(provenance)) => provenance,
            Ok(None) => TrainingProvenance::default(),
            Err(err) => {
                warn!("Could not read training provenance: {err}");
                TrainingProvenance::default()
            }
        };
        let model_exists = matches!(self.models.load(), Ok(Some(_)));
        ModelInfo {
            model_exists,
            provenance,
        }
    }

    fn raw_prediction(
        &self,
        description: &str,
        category: Category,
    ) -> Result<UrgencyPrediction, TrainError> {
        let pipeline = match self.models.load() {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => self.bootstrap()?,
            Err(err) => {
                warn!("Persisted model unusable, bootstrapping a fresh fit: {err}");
                self.bootstrap()?
            }
        };
        Ok(pipeline.predict(description, category)?)
    }

    /// First-use fit over the synthetic corpus only.
    fn bootstrap(&self) -> Result<TrainedPipeline, TrainError> {
        let examples = corpus::generate();
        let pipeline = TrainedPipeline::fit(&examples, &self.options)?;
        let provenance = TrainingProvenance {
            last_training: now_rfc3339(),
            total_samples: examples.len(),
            real_sample_count: 0,
            // Placeholder; nothing was held out of the bootstrap fit.
            accuracy: 1.0,
            training_type: TrainingType::Initial,
            version: "1.0".to_string(),
        };
        if let Err(err) = self.models.save(&pipeline, &provenance) {
            // The fitted pipeline is still good for this call.
            warn!("Could not persist bootstrapped model: {err}");
        } else {
            info!(total = examples.len(), "Bootstrapped urgency model");
        }
        Ok(pipeline)
    }

    /// Fit the pipeline, holding out a stratified test slice for an accuracy
    /// estimate when the corpus is large enough.
    fn fit_with_holdout(
        &self,
        merged: &[LabeledExample],
    ) -> Result<(TrainedPipeline, f32), TrainError> {
        if merged.len() <= HOLDOUT_THRESHOLD {
            let pipeline = TrainedPipeline::fit(merged, &self.options)?;
            return Ok((pipeline, SMALL_CORPUS_ACCURACY));
        }

        let (train_idx, test_idx) = stratified_split(merged, HOLDOUT_FRACTION, HOLDOUT_SEED);
        let train: Vec<LabeledExample> =
            train_idx.iter().map(|&i| merged[i].clone()).collect();
        let pipeline = TrainedPipeline::fit(&train, &self.options)?;

        let mut cm = ConfusionMatrix::new(Urgency::ALL.len());
        for &i in &test_idx {
            let example = &merged[i];
            let predicted = pipeline.predict(&example.description, example.category)?;
            cm.add(example.urgency.class_index(), predicted.label.class_index());
        }
        Ok((pipeline, cm.accuracy()))
    }
}

/// Split example indices into train/test, stratified by urgency tier.
/// Classes with fewer than two examples are never held out.
fn stratified_split(
    examples: &[LabeledExample],
    test_fraction: f32,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for urgency in Urgency::ALL {
        let mut indices: Vec<usize> = examples
            .iter()
            .enumerate()
            .filter(|(_, example)| example.urgency == urgency)
            .map(|(i, _)| i)
            .collect();
        indices.shuffle(&mut rng);
        let n_test = if indices.len() < 2 {
            0
        } else {
            ((indices.len() as f32 * test_fraction).floor() as usize).max(1)
        };
        test.extend(indices.drain(..n_test));
        train.extend(indices);
    }
    (train, test)
}

fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaints::store::MemoryComplaintStore;
    use crate::ml::forest::ForestOptions;
    use crate::model_store::MemoryModelStore;
    use std::sync::Arc;

    fn fast_options() -> PipelineOptions {
        PipelineOptions {
            forest: ForestOptions {
                n_trees: 20,
                ..ForestOptions::default()
            },
            ..PipelineOptions::default()
        }
    }

    fn engine_with_stores() -> (
        TriageEngine<Arc<MemoryModelStore>, Arc<MemoryComplaintStore>>,
        Arc<MemoryModelStore>,
        Arc<MemoryComplaintStore>,
    ) {
        let models = Arc::new(MemoryModelStore::new());
        let complaints = Arc::new(MemoryComplaintStore::new());
        let engine = TriageEngine::with_options(
            Arc::clone(&models),
            Arc::clone(&complaints),
            fast_options(),
        );
        (engine, models, complaints)
    }

    #[test]
    fn first_prediction_bootstraps_and_persists() {
        let (engine, models, _) = engine_with_stores();
        assert!(models.load().unwrap().is_none());

        let label = engine.predict_urgency(
            "streetlight replacement bulb not working",
            Category::StreetlightElectricity,
        );
        assert!(Urgency::ALL.contains(&label));

        let info = engine.model_info();
        assert!(info.model_exists);
        assert_eq!(info.provenance.training_type, TrainingType::Initial);
        assert_eq!(info.provenance.version, "1.0");
        assert_eq!(info.provenance.real_sample_count, 0);
    }

    #[test]
    fn emergency_description_is_high_regardless_of_model() {
        let (engine, _, _) = engine_with_stores();
        let label = engine.predict_urgency(
            "gas leak smell strong entire building evacuation needed",
            Category::PublicSafety,
        );
        assert_eq!(label, Urgency::High);
    }

    #[test]
    fn prediction_is_deterministic_across_calls() {
        let (engine, _, _) = engine_with_stores();
        let description = "water meter reading request schedule visit";
        let first = engine.predict_urgency(description, Category::WaterSupply);
        let second = engine.predict_urgency(description, Category::WaterSupply);
        assert_eq!(first, second);
    }

    #[test]
    fn unparseable_category_is_classified_as_other() {
        let (engine, _, _) = engine_with_stores();
        let label = engine.predict_urgency_lossy("park bench paint faded", "Weather Control");
        assert!(Urgency::ALL.contains(&label));
    }

    #[test]
    fn retrain_records_real_sample_count() {
        let (engine, _, complaints) = engine_with_stores();
        for i in 0..4 {
            complaints.push(LabeledExample::new(
                format!("pothole near junction number {i} growing wider"),
                Category::RoadsPotholes,
                Urgency::Medium,
            ));
        }
        assert!(engine.retrain().unwrap());
        let info = engine.model_info();
        assert_eq!(info.provenance.training_type, TrainingType::Retrain);
        assert_eq!(info.provenance.real_sample_count, 4);
        assert_eq!(info.provenance.version, "2.0");
        assert!(info.provenance.accuracy > 0.0);
    }

    #[test]
    fn nine_new_complaints_do_not_trigger_a_retrain() {
        let (engine, _, complaints) = engine_with_stores();
        // Baseline: trained with zero real complaints on record.
        assert!(engine.retrain().unwrap());
        let baseline = engine.model_info().provenance;
        assert_eq!(baseline.real_sample_count, 0);

        for i in 0..9 {
            complaints.push(LabeledExample::new(
                format!("garbage bin overflowing lane {i}"),
                Category::GarbageWaste,
                Urgency::Medium,
            ));
        }
        engine.train_if_needed();
        let after = engine.model_info().provenance;
        assert_eq!(after.real_sample_count, 0);
        assert_eq!(after.last_training, baseline.last_training);
    }

    #[test]
    fn tenth_new_complaint_triggers_a_retrain() {
        let (engine, _, complaints) = engine_with_stores();
        assert!(engine.retrain().unwrap());
        for i in 0..10 {
            complaints.push(LabeledExample::new(
                format!("garbage bin overflowing lane {i}"),
                Category::GarbageWaste,
                Urgency::Medium,
            ));
        }
        engine.train_if_needed();
        let after = engine.model_info().provenance;
        assert_eq!(after.real_sample_count, 10);
        assert_eq!(after.training_type, TrainingType::Retrain);
    }

    #[test]
    fn five_real_complaints_trigger_first_training_when_never_trained() {
        let (engine, _, complaints) = engine_with_stores();
        for i in 0..5 {
            complaints.push(LabeledExample::new(
                format!("noise complaint from venue {i}"),
                Category::NoisePollution,
                Urgency::Low,
            ));
        }
        // No provenance yet: training_type defaults to none.
        engine.train_if_needed();
        let after = engine.model_info().provenance;
        assert_eq!(after.training_type, TrainingType::Retrain);
        assert_eq!(after.real_sample_count, 5);
    }

    #[test]
    fn broken_pipeline_options_fall_back_to_keywords() {
        // A zero-width vectorizer makes every fit fail, forcing the keyword
        // fallback path end to end.
        let models = MemoryModelStore::new();
        let complaints = MemoryComplaintStore::new();
        let mut options = fast_options();
        options.vectorizer.max_features = 0;
        let engine = TriageEngine::with_options(models, complaints, options);

        assert_eq!(
            engine.predict_urgency(
                "emergency wire sparking near school",
                Category::StreetlightElectricity
            ),
            Urgency::High
        );
        assert_eq!(
            engine.predict_urgency("new park bench request", Category::OtherMunicipal),
            Urgency::Low
        );
    }

    #[test]
    fn stratified_split_keeps_every_tier_in_training() {
        let examples = corpus::generate();
        let (train, test) = stratified_split(&examples, 0.2, 7);
        assert_eq!(train.len() + test.len(), examples.len());
        assert!(!test.is_empty());
        for urgency in Urgency::ALL {
            assert!(
                train
                    .iter()
                    .any(|&i| examples[i].urgency == urgency),
                "tier {urgency} missing from training split"
            );
        }
    }
}
