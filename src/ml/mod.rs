//! Feature extraction and classification for complaint urgency.
//!
//! The pipeline pairs a TF-IDF n-gram vectorizer with a bagged-tree ensemble;
//! both halves serialize independently so persisted state stays inspectable.

pub mod forest;
pub mod metrics;
pub mod pipeline;
pub mod vectorizer;
