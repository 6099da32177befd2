//! Application directory helpers anchored to a single `.civic_triage` folder.
//!
//! Model blobs and logs live under the OS config directory by default; a
//! `CIVIC_TRIAGE_CONFIG_HOME` override supports tests and portable setups.

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory under the OS config root.
pub const APP_DIR_NAME: &str = ".civic_triage";

/// Environment variable overriding the config base directory.
pub const CONFIG_HOME_ENV: &str = "CIVIC_TRIAGE_CONFIG_HOME";

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.civic_triage` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    create_subdir(base, APP_DIR_NAME)
}

/// Directory holding the persisted model blobs and provenance record.
pub fn model_dir() -> Result<PathBuf, AppDirError> {
    create_subdir(app_root_dir()?, "model")
}

/// Directory holding launch log files.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    create_subdir(app_root_dir()?, "logs")
}

fn create_subdir(base: PathBuf, name: &str) -> Result<PathBuf, AppDirError> {
    let path = base.join(name);
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn config_base_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_HOME_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdirectories_nest_under_the_app_root() {
        // Resolution is environment-dependent; only check the shape.
        if let (Ok(root), Ok(model), Ok(logs)) = (app_root_dir(), model_dir(), logs_dir()) {
            assert!(root.ends_with(APP_DIR_NAME));
            assert_eq!(model.parent(), Some(root.as_path()));
            assert_eq!(logs.parent(), Some(root.as_path()));
        }
    }
}
