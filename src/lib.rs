//! Urgency classification and retraining for a municipal complaint portal.
/// Application directory helpers.
pub mod app_dirs;
/// Complaint domain types and the record-store boundary.
pub mod complaints;
/// Hand-authored bootstrap training corpus.
pub mod corpus;
/// Retraining controller and prediction facade.
pub mod engine;
/// Resolution-time lookup.
pub mod estimator;
/// Logging setup.
pub mod logging;
/// Text vectorizer, forest classifier, and evaluation metrics.
pub mod ml;
/// Persisted pipeline and provenance storage.
pub mod model_store;
/// Keyword override rules and the rule-based fallback predictor.
pub mod rules;
/// Complaint text normalization.
pub mod text;
