//! Batch train-evaluate-persist pipeline for tabular classification.
//!
//! [`RunController`] loads `train.csv` and `test.csv`, fits a
//! [`Classifier`], scores the model on both datasets and writes
//! `model.joblib` into the model directory. The learning algorithm sits
//! behind the [`Classifier`] / [`TrainedModel`] / [`ModelArtifact`] traits;
//! [`ForestClassifier`] is the random forest implementation.

mod classifier;
mod config;
mod confusion;
mod controller;
mod error;
mod evaluator;
mod loader;
mod publisher;
mod trainer;

pub use classifier::{Classifier, ForestClassifier, ForestModel, ModelArtifact, TrainedModel};
pub use config::{
    ConfigError, DEFAULT_RANDOM_SEED, DEFAULT_TREE_COUNT, DEFAULT_VERBOSITY, Hyperparameters,
    RunConfig,
};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use controller::{DatasetShape, RunController, RunFailure, RunStage, RunSummary};
pub use error::{BoxError, PipelineError, ShapeError};
pub use evaluator::{AverageMetrics, ClassificationReport, EvaluationReport, evaluate};
pub use loader::load_dataset;
pub use publisher::{
    ArtifactVerificationWarning, MODEL_FILE_NAME, Publication, publish, verify_artifact,
};
pub use trainer::train;

pub use canopy_io::{ClassLabel, Dataset, DatasetRole};
