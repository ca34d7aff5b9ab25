//! Pipeline error taxonomy.

use std::path::PathBuf;

use canopy_io::{DatasetRole, IoError};

/// Boxed error from a pluggable classifier or artifact writer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal errors raised by a pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Returned when input data is missing, malformed, empty, or does not fit the model.
    #[error("invalid {role} dataset")]
    InvalidDatasetShape {
        /// Which dataset was rejected.
        role: DatasetRole,
        /// What was wrong with it.
        source: ShapeError,
    },

    /// Returned when the fitting capability could not produce a model.
    #[error("training failed")]
    TrainingFailure {
        /// Error raised by the classifier.
        source: BoxError,
    },

    /// Returned when the model directory or artifact could not be written.
    #[error("failed to persist model artifact at {path}")]
    ArtifactPersistenceFailure {
        /// Directory or file being written.
        path: PathBuf,
        /// Underlying write error.
        source: BoxError,
    },
}

impl PipelineError {
    /// Short, stable name of the error kind for logs and summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidDatasetShape { .. } => "InvalidDatasetShape",
            PipelineError::TrainingFailure { .. } => "TrainingFailure",
            PipelineError::ArtifactPersistenceFailure { .. } => "ArtifactPersistenceFailure",
        }
    }
}

/// Why a dataset was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    /// The file could not be read or failed row validation.
    #[error("could not load dataset")]
    Load {
        #[from]
        source: IoError,
    },

    /// The dataset has no rows.
    #[error("dataset has no rows")]
    Empty,

    /// The dataset's feature count differs from the model's.
    #[error("dataset has {got} feature column(s), model expects {expected}")]
    FeatureMismatch {
        /// Feature count the model was trained on.
        expected: usize,
        /// Feature count of the dataset.
        got: usize,
    },

    /// The model rejected the dataset at prediction time.
    #[error("model could not predict on dataset")]
    Prediction {
        /// Error raised by the model.
        source: BoxError,
    },

    /// The model returned a different number of predictions than rows.
    #[error("model returned {got} predictions for {expected} rows")]
    PredictionCount {
        /// Number of rows.
        expected: usize,
        /// Number of predictions.
        got: usize,
    },
}
