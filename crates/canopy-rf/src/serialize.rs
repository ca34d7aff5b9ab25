//! Model files: a versioned bincode envelope around the forest.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 3;

#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    forest: RandomForest,
}

impl RandomForest {
    /// Encode the model as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::SerializeModel`] if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RfError> {
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.n_trees(),
            n_features: self.n_features,
            n_classes: self.n_classes(),
            forest: self.clone(),
        };
        bincode::serialize(&envelope).map_err(|source| RfError::SerializeModel { source })
    }

    /// Save the model to a binary file, replacing any existing file.
    ///
    /// The bytes go to a temporary file in the same directory, which is then
    /// renamed over `path`. A failed save leaves `path` untouched and removes
    /// the temporary file.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | temporary file write or rename failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<usize, RfError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let write_error = |source| RfError::WriteModel {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(&bytes).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged
            .persist(path)
            .map_err(|persist| write_error(persist.error))?;

        info!(size_bytes = bytes.len(), n_trees = self.n_trees(), "model saved");
        Ok(bytes.len())
    }

    /// Load a model from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|source| RfError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;

        // The version is the leading u32 of the envelope; check it before
        // decoding the rest so older layouts report a version error.
        let found: u32 = bincode::deserialize(&bytes).map_err(|source| {
            RfError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if found != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|source| RfError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            "model loaded"
        );
        Ok(envelope.forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::FORMAT_VERSION;
    use crate::config::RandomForestConfig;
    use crate::forest::RandomForest;
    use crate::RfError;

    fn train_simple_model() -> RandomForest {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let classes = vec!["low".to_string(), "high".to_string()];
        RandomForestConfig::new(5)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &classes)
            .unwrap()
    }

    #[test]
    fn reload_preserves_predictions_and_classes() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");

        let forest = train_simple_model();
        let written = forest.save(&model_path).unwrap();
        assert_eq!(written as u64, std::fs::metadata(&model_path).unwrap().len());

        let loaded = RandomForest::load(&model_path).unwrap();
        assert_eq!(loaded.class_names(), forest.class_names());
        for sample in [[1.5, 0.0], [11.0, 0.0], [5.0, 0.0]] {
            assert_eq!(
                forest.predict_proba(&sample).unwrap(),
                loaded.predict_proba(&sample).unwrap()
            );
        }
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");
        std::fs::write(&model_path, b"stale").unwrap();

        train_simple_model().save(&model_path).unwrap();
        assert!(RandomForest::load(&model_path).is_ok());
    }

    #[test]
    fn failed_save_leaves_no_file_behind() {
        let dir = TempDir::new().unwrap();
        let missing_parent = dir.path().join("absent").join("model.bin");

        let err = train_simple_model().save(&missing_parent).unwrap_err();
        assert!(matches!(err, RfError::WriteModel { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_rename_cleans_up_staged_file() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("model.bin");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), b"occupied").unwrap();

        let err = train_simple_model().save(&blocked).unwrap_err();
        assert!(matches!(err, RfError::WriteModel { .. }));
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("model.bin")]);
        assert!(blocked.is_dir());
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, RfError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"no").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, RfError::DeserializeModel { .. }));
    }

    #[test]
    fn version_mismatch_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.bin");
        let mut bytes = train_simple_model().to_bytes().unwrap();
        bytes[..4].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, RfError::IncompatibleModelVersion { found, .. } if found == FORMAT_VERSION + 1));
    }
}
