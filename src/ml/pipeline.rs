//! Paired vectorizer + classifier fit jointly over labeled complaints.

use thiserror::Error;

use crate::complaints::{Category, LabeledExample, Urgency, UrgencyPrediction};
use crate::ml::forest::{ForestModel, ForestOptions, TrainDataset, train_forest};
use crate::ml::vectorizer::{TfidfVectorizer, VectorizerOptions};
use crate::text;

/// Errors raised while fitting or predicting with the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Training corpus is empty")]
    EmptyCorpus,
    #[error("Pipeline fit failed: {0}")]
    Fit(String),
    #[error("Persisted model state is invalid: {0}")]
    InvalidModel(String),
}

/// Hyperparameters for both pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub vectorizer: VectorizerOptions,
    pub forest: ForestOptions,
}

/// A fitted vectorizer/classifier pair. Replaced atomically on retrain,
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    pub vectorizer: TfidfVectorizer,
    pub forest: ForestModel,
}

impl TrainedPipeline {
    /// Fit both stages over labeled examples.
    pub fn fit(
        examples: &[LabeledExample],
        options: &PipelineOptions,
    ) -> Result<Self, PipelineError> {
        if examples.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        let documents: Vec<String> = examples
            .iter()
            .map(|example| text::combine(&example.description, example.category))
            .collect();
        let vectorizer =
            TfidfVectorizer::fit(&documents, &options.vectorizer).map_err(PipelineError::Fit)?;
        let x: Vec<Vec<f32>> = documents
            .iter()
            .map(|document| vectorizer.transform(document))
            .collect();
        let y: Vec<usize> = examples
            .iter()
            .map(|example| example.urgency.class_index())
            .collect();
        let dataset = TrainDataset {
            classes: Urgency::ALL.iter().map(|u| u.as_str().to_string()).collect(),
            x,
            y,
        };
        let forest = train_forest(&dataset, &options.forest).map_err(PipelineError::Fit)?;
        Ok(Self { vectorizer, forest })
    }

    /// Classify one complaint; returns the top tier and its probability.
    pub fn predict(
        &self,
        description: &str,
        category: Category,
    ) -> Result<UrgencyPrediction, PipelineError> {
        let features = self.vectorizer.transform(&text::combine(description, category));
        if features.len() != self.forest.n_features {
            return Err(PipelineError::InvalidModel(format!(
                "vectorizer yields {} features but the forest expects {}",
                features.len(),
                self.forest.n_features
            )));
        }
        let (class_index, confidence) = self.forest.predict(&features);
        let label = self
            .forest
            .classes
            .get(class_index)
            .and_then(|name| name.parse::<Urgency>().ok())
            .ok_or_else(|| {
                PipelineError::InvalidModel(format!("unknown class at index {class_index}"))
            })?;
        Ok(UrgencyPrediction { label, confidence })
    }

    /// Structural validation applied after loading persisted state.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.vectorizer
            .validate()
            .map_err(PipelineError::InvalidModel)?;
        self.forest.validate().map_err(PipelineError::InvalidModel)?;
        if self.vectorizer.len() != self.forest.n_features {
            return Err(PipelineError::InvalidModel(
                "vectorizer and forest disagree on feature length".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus;

    fn fast_options() -> PipelineOptions {
        PipelineOptions {
            forest: ForestOptions {
                n_trees: 20,
                ..ForestOptions::default()
            },
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn fits_and_predicts_on_the_bootstrap_corpus() {
        let pipeline = TrainedPipeline::fit(&corpus::generate(), &fast_options()).unwrap();
        pipeline.validate().unwrap();
        let prediction = pipeline
            .predict("small pothole minor inconvenience can wait", Category::RoadsPotholes)
            .unwrap();
        assert!(Urgency::ALL.contains(&prediction.label));
        assert!(prediction.confidence >= 0.0 && prediction.confidence <= 1.0);
    }

    #[test]
    fn prediction_is_deterministic() {
        let pipeline = TrainedPipeline::fit(&corpus::generate(), &fast_options()).unwrap();
        let first = pipeline
            .predict("garbage collection irregular delay", Category::GarbageWaste)
            .unwrap();
        let second = pipeline
            .predict("garbage collection irregular delay", Category::GarbageWaste)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(matches!(
            TrainedPipeline::fit(&[], &PipelineOptions::default()),
            Err(PipelineError::EmptyCorpus)
        ));
    }

    #[test]
    fn validate_catches_feature_length_drift() {
        let pipeline = TrainedPipeline::fit(&corpus::generate(), &fast_options()).unwrap();
        let mut broken = pipeline.clone();
        broken.forest.n_features += 1;
        assert!(broken.validate().is_err());
        assert!(broken
            .predict("water pipe burst", Category::WaterSupply)
            .is_err());
    }
}
