//! Artifact Publisher: write the model into the model directory and check it landed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::classifier::ModelArtifact;
use crate::error::PipelineError;

/// File name of the model artifact inside the model directory.
pub const MODEL_FILE_NAME: &str = "model.joblib";

/// Non-fatal finding from the post-write artifact check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactVerificationWarning {
    /// The artifact is absent after the write reported success.
    #[error("model file was not created at {path}")]
    Missing {
        path: PathBuf,
    },

    /// The artifact exists but holds no bytes.
    #[error("model file at {path} is empty")]
    Empty {
        path: PathBuf,
    },

    /// The artifact could not be inspected.
    #[error("could not inspect model file at {path}: {reason}")]
    Unreadable {
        path: PathBuf,
        reason: String,
    },
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Publication {
    path: PathBuf,
    size_bytes: Option<u64>,
    warning: Option<ArtifactVerificationWarning>,
}

impl Publication {
    /// Where the artifact was written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Artifact size on disk, when verification succeeded.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    #[must_use]
    pub fn warning(&self) -> Option<&ArtifactVerificationWarning> {
        self.warning.as_ref()
    }
}

/// Persist `model` to `model_dir/model.joblib`, creating `model_dir` if needed.
///
/// Publishing again into the same directory replaces the artifact. After the
/// write the file is re-checked on disk; a failed check is logged and
/// carried in [`Publication::warning`] without failing the call.
///
/// # Errors
///
/// Returns [`PipelineError::ArtifactPersistenceFailure`] if the directory
/// cannot be created or the model cannot be written.
#[instrument(skip(model), fields(model_dir = %model_dir.display()))]
pub fn publish<M: ModelArtifact>(model: &M, model_dir: &Path) -> Result<Publication, PipelineError> {
    std::fs::create_dir_all(model_dir).map_err(|e| PipelineError::ArtifactPersistenceFailure {
        path: model_dir.to_path_buf(),
        source: Box::new(e),
    })?;

    let path = model_dir.join(MODEL_FILE_NAME);
    model
        .save(&path)
        .map_err(|e| PipelineError::ArtifactPersistenceFailure {
            path: path.clone(),
            source: Box::new(e),
        })?;

    let publication = match verify_artifact(&path) {
        Ok(size_bytes) => {
            info!(path = %path.display(), size_bytes, "model artifact written");
            Publication {
                path,
                size_bytes: Some(size_bytes),
                warning: None,
            }
        }
        Err(warning) => {
            warn!(%warning, "model artifact verification failed");
            Publication {
                path,
                size_bytes: None,
                warning: Some(warning),
            }
        }
    };
    Ok(publication)
}

/// Re-read file metadata and return the artifact's byte size.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ArtifactVerificationWarning::Missing`] | no file at `path` |
/// | [`ArtifactVerificationWarning::Empty`] | file has zero bytes |
/// | [`ArtifactVerificationWarning::Unreadable`] | metadata lookup failed otherwise, or `path` is not a file |
pub fn verify_artifact(path: &Path) -> Result<u64, ArtifactVerificationWarning> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ArtifactVerificationWarning::Missing {
            path: path.to_path_buf(),
        },
        _ => ArtifactVerificationWarning::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(ArtifactVerificationWarning::Unreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    match metadata.len() {
        0 => Err(ArtifactVerificationWarning::Empty {
            path: path.to_path_buf(),
        }),
        size => Ok(size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Writes a fixed payload, or nothing at all when `payload` is `None`.
    struct Payload(Option<&'static str>);

    impl ModelArtifact for Payload {
        type SaveError = std::io::Error;

        fn save(&self, path: &Path) -> Result<(), std::io::Error> {
            match self.0 {
                Some(text) => fs::write(path, text),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn creates_nested_model_dir() {
        let root = tempfile::tempdir().unwrap();
        let model_dir = root.path().join("opt").join("ml").join("model");

        let publication = publish(&Payload(Some("forest")), &model_dir).unwrap();
        assert_eq!(publication.path(), model_dir.join(MODEL_FILE_NAME));
        assert_eq!(publication.size_bytes(), Some(6));
        assert!(publication.warning().is_none());
    }

    #[test]
    fn publish_twice_replaces_artifact() {
        let dir = tempfile::tempdir().unwrap();
        publish(&Payload(Some("first version")), dir.path()).unwrap();
        let second = publish(&Payload(Some("second")), dir.path()).unwrap();

        assert_eq!(second.size_bytes(), Some(6));
        assert_eq!(fs::read(dir.path().join(MODEL_FILE_NAME)).unwrap(), b"second");
    }

    #[test]
    fn missing_artifact_is_warning_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let publication = publish(&Payload(None), dir.path()).unwrap();
        assert_eq!(publication.size_bytes(), None);
        assert!(matches!(
            publication.warning(),
            Some(ArtifactVerificationWarning::Missing { .. })
        ));
    }

    #[test]
    fn empty_artifact_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let publication = publish(&Payload(Some("")), dir.path()).unwrap();
        assert!(matches!(
            publication.warning(),
            Some(ArtifactVerificationWarning::Empty { .. })
        ));
    }

    #[test]
    fn model_dir_blocked_by_file() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("model");
        fs::write(&blocker, "not a directory").unwrap();

        let err = publish(&Payload(Some("forest")), &blocker).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArtifactPersistenceFailure { ref path, .. } if path == &blocker
        ));
    }

    #[test]
    fn directory_in_place_of_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE_NAME);
        fs::create_dir(&path).unwrap();
        assert!(matches!(
            verify_artifact(&path),
            Err(ArtifactVerificationWarning::Unreadable { .. })
        ));
    }
}
