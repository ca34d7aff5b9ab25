//! Training Orchestrator.

use std::time::Instant;

use canopy_io::{Dataset, DatasetRole};
use tracing::{info, instrument};

use crate::classifier::{Classifier, TrainedModel};
use crate::config::Hyperparameters;
use crate::error::{PipelineError, ShapeError};

/// Fit `classifier` on the training dataset.
///
/// The fit is one blocking call; any parallelism lives inside the classifier.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PipelineError::InvalidDatasetShape`] | `dataset` has no rows |
/// | [`PipelineError::TrainingFailure`] | the classifier returned an error |
#[instrument(skip_all, fields(classifier = classifier.name(), tree_count = hyperparameters.tree_count()))]
pub fn train<C: Classifier>(
    classifier: &C,
    dataset: &Dataset,
    hyperparameters: &Hyperparameters,
) -> Result<C::Model, PipelineError> {
    if dataset.is_empty() {
        return Err(PipelineError::InvalidDatasetShape {
            role: DatasetRole::Train,
            source: ShapeError::Empty,
        });
    }

    let start = Instant::now();
    let model = classifier
        .fit(dataset.features(), dataset.labels(), hyperparameters)
        .map_err(|e| PipelineError::TrainingFailure {
            source: Box::new(e),
        })?;

    info!(
        n_rows = dataset.n_rows(),
        n_features = model.n_features(),
        random_seed = hyperparameters.random_seed(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "model trained"
    );
    Ok(model)
}
