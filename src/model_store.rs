//! Persistence for the trained pipeline and its training provenance.
//!
//! The persisted layout is three JSON files under one directory: the
//! vectorizer blob, the forest blob, and the provenance record. A save stages
//! every file through a temp file in the same directory and renames, so a
//! retrain replaces the whole set or leaves the prior version authoritative.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::ml::pipeline::TrainedPipeline;

/// File names inside the model directory.
pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const FOREST_FILE: &str = "forest.json";
pub const PROVENANCE_FILE: &str = "provenance.json";

/// What kind of training produced the current model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingType {
    Initial,
    Retrain,
    None,
}

/// Metadata describing the most recent training event. Only the latest
/// record is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingProvenance {
    /// RFC 3339 timestamp of the last fit, or `None` if never trained.
    pub last_training: Option<String>,
    /// Synthetic plus real examples in the last fit.
    pub total_samples: usize,
    /// Historical complaints included in the last fit.
    pub real_sample_count: usize,
    /// Holdout accuracy, or a placeholder for small corpora (see DESIGN.md).
    pub accuracy: f32,
    pub training_type: TrainingType,
    pub version: String,
}

impl Default for TrainingProvenance {
    fn default() -> Self {
        Self {
            last_training: None,
            total_samples: 0,
            real_sample_count: 0,
            accuracy: 0.0,
            training_type: TrainingType::None,
            version: "0.0".to_string(),
        }
    }
}

/// Errors returned by model persistence.
#[derive(Debug, Error)]
pub enum ModelStoreError {
    #[error("Could not prepare model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt model file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Persisted model failed validation: {0}")]
    Invalid(String),
}

/// Storage boundary for the trained pipeline, injected into the engine so
/// tests can swap in an in-memory implementation.
pub trait ModelStore {
    /// Load the persisted pipeline, `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<TrainedPipeline>, ModelStoreError>;

    /// Replace pipeline and provenance together.
    fn save(
        &self,
        pipeline: &TrainedPipeline,
        provenance: &TrainingProvenance,
    ) -> Result<(), ModelStoreError>;

    /// Load the provenance record, `None` when nothing was saved yet.
    fn provenance(&self) -> Result<Option<TrainingProvenance>, ModelStoreError>;
}

impl<T: ModelStore> ModelStore for Arc<T> {
    fn load(&self) -> Result<Option<TrainedPipeline>, ModelStoreError> {
        self.as_ref().load()
    }

    fn save(
        &self,
        pipeline: &TrainedPipeline,
        provenance: &TrainingProvenance,
    ) -> Result<(), ModelStoreError> {
        self.as_ref().save(pipeline, provenance)
    }

    fn provenance(&self) -> Result<Option<TrainingProvenance>, ModelStoreError> {
        self.as_ref().provenance()
    }
}

/// Filesystem-backed store under a fixed directory.
pub struct FsModelStore {
    dir: PathBuf,
}

impl FsModelStore {
    /// Anchor the store at `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ModelStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ModelStoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when both pipeline blobs exist on disk.
    pub fn model_exists(&self) -> bool {
        self.dir.join(VECTORIZER_FILE).is_file() && self.dir.join(FOREST_FILE).is_file()
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        file_name: &str,
    ) -> Result<Option<T>, ModelStoreError> {
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|source| ModelStoreError::Read {
            path: path.clone(),
            source,
        })?;
        let value =
            serde_json::from_slice(&bytes).map_err(|source| ModelStoreError::Corrupt {
                path,
                source,
            })?;
        Ok(Some(value))
    }

    fn stage_json<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<NamedTempFile, ModelStoreError> {
        let mut staged =
            NamedTempFile::new_in(&self.dir).map_err(|source| ModelStoreError::Write {
                path: self.dir.clone(),
                source,
            })?;
        let bytes = serde_json::to_vec(value).map_err(|source| ModelStoreError::Corrupt {
            path: staged.path().to_path_buf(),
            source,
        })?;
        staged
            .write_all(&bytes)
            .map_err(|source| ModelStoreError::Write {
                path: staged.path().to_path_buf(),
                source,
            })?;
        Ok(staged)
    }
}

impl ModelStore for FsModelStore {
    fn load(&self) -> Result<Option<TrainedPipeline>, ModelStoreError> {
        let Some(vectorizer) = self.read_json(VECTORIZER_FILE)? else {
            return Ok(None);
        };
        let Some(forest) = self.read_json(FOREST_FILE)? else {
            return Ok(None);
        };
        let pipeline = TrainedPipeline { vectorizer, forest };
        pipeline
            .validate()
            .map_err(|err| ModelStoreError::Invalid(err.to_string()))?;
        Ok(Some(pipeline))
    }

    fn save(
        &self,
        pipeline: &TrainedPipeline,
        provenance: &TrainingProvenance,
    ) -> Result<(), ModelStoreError> {
        // Stage everything before renaming anything. The renames themselves
        // are still sequential, so a crash between them can leave blobs from
        // two different fits; load() runs pipeline validation and rejects
        // such a pair, which sends the engine down its bootstrap path.
        let staged = [
            (self.stage_json(&pipeline.vectorizer)?, VECTORIZER_FILE),
            (self.stage_json(&pipeline.forest)?, FOREST_FILE),
            (self.stage_json(provenance)?, PROVENANCE_FILE),
        ];
        for (file, name) in staged {
            let target = self.dir.join(name);
            file.persist(&target)
                .map_err(|err| ModelStoreError::Write {
                    path: target,
                    source: err.error,
                })?;
        }
        Ok(())
    }

    fn provenance(&self) -> Result<Option<TrainingProvenance>, ModelStoreError> {
        self.read_json(PROVENANCE_FILE)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryModelStore {
    state: Mutex<Option<(TrainedPipeline, TrainingProvenance)>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self) -> Result<Option<TrainedPipeline>, ModelStoreError> {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(state.as_ref().map(|(pipeline, _)| pipeline.clone()))
    }

    fn save(
        &self,
        pipeline: &TrainedPipeline,
        provenance: &TrainingProvenance,
    ) -> Result<(), ModelStoreError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = Some((pipeline.clone(), provenance.clone()));
        Ok(())
    }

    fn provenance(&self) -> Result<Option<TrainingProvenance>, ModelStoreError> {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(state.as_ref().map(|(_, provenance)| provenance.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus;
    use crate::ml::forest::ForestOptions;
    use crate::ml::pipeline::PipelineOptions;
    use tempfile::tempdir;

    fn fit_on(examples: &[crate::complaints::LabeledExample]) -> TrainedPipeline {
        let options = PipelineOptions {
            forest: ForestOptions {
                n_trees: 5,
                ..ForestOptions::default()
            },
            ..PipelineOptions::default()
        };
        TrainedPipeline::fit(examples, &options).unwrap()
    }

    fn fitted_pipeline() -> TrainedPipeline {
        fit_on(&corpus::generate())
    }

    fn provenance() -> TrainingProvenance {
        TrainingProvenance {
            last_training: Some("2026-01-01T00:00:00Z".to_string()),
            total_samples: 120,
            real_sample_count: 4,
            accuracy: 0.9,
            training_type: TrainingType::Retrain,
            version: "2.0".to_string(),
        }
    }

    #[test]
    fn empty_directory_loads_nothing() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(store.provenance().unwrap().is_none());
        assert!(!store.model_exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        let pipeline = fitted_pipeline();
        store.save(&pipeline, &provenance()).unwrap();

        assert!(store.model_exists());
        let loaded = store.load().unwrap().unwrap();
        loaded.validate().unwrap();
        assert_eq!(loaded.vectorizer.len(), pipeline.vectorizer.len());
        let record = store.provenance().unwrap().unwrap();
        assert_eq!(record.training_type, TrainingType::Retrain);
        assert_eq!(record.real_sample_count, 4);
    }

    #[test]
    fn truncated_blob_reports_corruption() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        store.save(&fitted_pipeline(), &provenance()).unwrap();

        let forest_path = dir.path().join(FOREST_FILE);
        let bytes = std::fs::read(&forest_path).unwrap();
        std::fs::write(&forest_path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(
            store.load(),
            Err(ModelStoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn blobs_from_different_fits_fail_validation_on_load() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        store.save(&fitted_pipeline(), &provenance()).unwrap();

        // A crash between renames could pair the old forest with a new
        // vectorizer; a fit over a smaller corpus has a different vocabulary.
        let other = fit_on(&corpus::generate()[..30]);
        assert_ne!(other.vectorizer.len(), fitted_pipeline().vectorizer.len());
        std::fs::write(
            dir.path().join(VECTORIZER_FILE),
            serde_json::to_vec(&other.vectorizer).unwrap(),
        )
        .unwrap();

        assert!(matches!(store.load(), Err(ModelStoreError::Invalid(_))));
    }

    #[test]
    fn save_leaves_no_stray_temp_files() {
        let dir = tempdir().unwrap();
        let store = FsModelStore::new(dir.path()).unwrap();
        store.save(&fitted_pipeline(), &provenance()).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        for name in names {
            assert!(name.ends_with(".json"), "unexpected file {name}");
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryModelStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&fitted_pipeline(), &provenance()).unwrap();
        assert!(store.load().unwrap().is_some());
        assert_eq!(
            store.provenance().unwrap().unwrap().total_samples,
            120
        );
    }
}
