//! Dataset Loader: job directories in, validated datasets out.

use std::path::Path;

use canopy_io::{Dataset, DatasetReader, DatasetRole};
use tracing::{info, instrument};

use crate::error::{PipelineError, ShapeError};

/// Read `dir/<role file name>` and split it into features and labels.
///
/// Logs the dataset shape and its class distribution.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDatasetShape`] wrapping
/// [`ShapeError::Load`] for any read or validation failure, including a
/// missing file, fewer than two columns and zero rows.
#[instrument(skip_all, fields(role = %role, dir = %dir.display()))]
pub fn load_dataset(dir: &Path, role: DatasetRole) -> Result<Dataset, PipelineError> {
    let path = dir.join(role.file_name());
    let dataset = DatasetReader::new(&path)
        .read()
        .map_err(|source| PipelineError::InvalidDatasetShape {
            role,
            source: ShapeError::from(source),
        })?;

    info!(
        %role,
        n_rows = dataset.n_rows(),
        n_columns = dataset.n_columns(),
        n_features = dataset.n_features(),
        "dataset shape"
    );
    for (class, count) in dataset.class_counts() {
        info!(%role, %class, count, "class distribution");
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use canopy_io::IoError;

    #[test]
    fn loads_role_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.csv"), "1.0,2.0,0\n2.0,1.0,1\n").unwrap();

        let dataset = load_dataset(dir.path(), DatasetRole::Train).unwrap();
        assert_eq!(dataset.n_rows(), 2);
        assert_eq!(dataset.n_features(), dataset.n_columns() - 1);
    }

    #[test]
    fn missing_file_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(dir.path(), DatasetRole::Test).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidDatasetShape {
                role: DatasetRole::Test,
                source: ShapeError::Load {
                    source: IoError::FileNotFound { .. }
                }
            }
        ));
    }

    #[test]
    fn label_only_file_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.csv"), "0\n1\n").unwrap();
        let err = load_dataset(dir.path(), DatasetRole::Train).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidDatasetShape {
                source: ShapeError::Load {
                    source: IoError::TooFewColumns { .. }
                },
                ..
            }
        ));
    }
}
