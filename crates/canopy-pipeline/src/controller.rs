//! Run Controller: sequences load, train, evaluate and publish.
//!
//! ```text
//! Init -> Loading -> Training -> Evaluating -> Publishing -> Done
//!   \________\___________\____________\____________\-----> Failed
//! ```

use std::fmt;

use canopy_io::{ClassLabel, Dataset, DatasetRole};
use tracing::{error, info, instrument};

use crate::classifier::Classifier;
use crate::config::{Hyperparameters, RunConfig};
use crate::error::PipelineError;
use crate::evaluator::{EvaluationReport, evaluate};
use crate::loader::load_dataset;
use crate::publisher::{Publication, publish};
use crate::trainer::train;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    Loading,
    Training,
    Evaluating,
    Publishing,
    Done,
    Failed,
}

impl RunStage {
    /// The stage that follows this one on success, or `None` when terminal.
    #[must_use]
    pub fn next(self) -> Option<RunStage> {
        match self {
            RunStage::Init => Some(RunStage::Loading),
            RunStage::Loading => Some(RunStage::Training),
            RunStage::Training => Some(RunStage::Evaluating),
            RunStage::Evaluating => Some(RunStage::Publishing),
            RunStage::Publishing => Some(RunStage::Done),
            RunStage::Done | RunStage::Failed => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStage::Init => "init",
            RunStage::Loading => "loading",
            RunStage::Training => "training",
            RunStage::Evaluating => "evaluating",
            RunStage::Publishing => "publishing",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        })
    }
}

/// Row and feature counts of one loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DatasetShape {
    pub role: DatasetRole,
    pub n_rows: usize,
    pub n_features: usize,
}

impl DatasetShape {
    fn of(dataset: &Dataset, role: DatasetRole) -> Self {
        Self {
            role,
            n_rows: dataset.n_rows(),
            n_features: dataset.n_features(),
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub classifier: &'static str,
    pub hyperparameters: Hyperparameters,
    pub stages: Vec<RunStage>,
    pub train_shape: DatasetShape,
    pub test_shape: DatasetShape,
    /// Distinct training labels, in class order.
    pub classes: Vec<ClassLabel>,
    pub evaluation: EvaluationReport,
    pub publication: Publication,
}

/// A run that ended in [`RunStage::Failed`].
#[derive(Debug, thiserror::Error)]
#[error("run failed during {stage}: {kind}", kind = .source.kind())]
pub struct RunFailure {
    stage: RunStage,
    stages: Vec<RunStage>,
    source: PipelineError,
}

impl RunFailure {
    /// The stage that was running when the error occurred.
    #[must_use]
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Every stage entered, ending with [`RunStage::Failed`].
    #[must_use]
    pub fn stages(&self) -> &[RunStage] {
        &self.stages
    }

    #[must_use]
    pub fn error(&self) -> &PipelineError {
        &self.source
    }

    /// Consume the failure, returning the stage error.
    #[must_use]
    pub fn into_error(self) -> PipelineError {
        self.source
    }
}

struct StageOutputs {
    train_shape: DatasetShape,
    test_shape: DatasetShape,
    classes: Vec<ClassLabel>,
    evaluation: EvaluationReport,
    publication: Publication,
}

/// Drives one run of the pipeline.
///
/// Stages run strictly in order on the calling thread; nothing is retried
/// and nothing is resumed. Any stage error moves the run to
/// [`RunStage::Failed`] and discards the in-memory datasets and model.
pub struct RunController<C> {
    config: RunConfig,
    classifier: C,
    stage: RunStage,
    history: Vec<RunStage>,
}

impl<C: Classifier> RunController<C> {
    /// Create a controller in [`RunStage::Init`].
    pub fn new(config: RunConfig, classifier: C) -> Self {
        Self {
            config,
            classifier,
            stage: RunStage::Init,
            history: vec![RunStage::Init],
        }
    }

    #[must_use]
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every stage to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the failed stage, the stages
    /// visited and the [`PipelineError`] that stopped the run.
    #[instrument(skip_all, fields(classifier = self.classifier.name()))]
    pub fn run(mut self) -> Result<RunSummary, RunFailure> {
        match self.run_stages() {
            Ok(outputs) => {
                self.enter(RunStage::Done);
                Ok(RunSummary {
                    classifier: self.classifier.name(),
                    hyperparameters: *self.config.hyperparameters(),
                    stages: self.history,
                    train_shape: outputs.train_shape,
                    test_shape: outputs.test_shape,
                    classes: outputs.classes,
                    evaluation: outputs.evaluation,
                    publication: outputs.publication,
                })
            }
            Err(source) => {
                let stage = self.stage;
                self.enter(RunStage::Failed);
                error!(
                    %stage,
                    kind = source.kind(),
                    error = %error_chain(&source),
                    "run failed"
                );
                Err(RunFailure {
                    stage,
                    stages: self.history,
                    source,
                })
            }
        }
    }

    fn run_stages(&mut self) -> Result<StageOutputs, PipelineError> {
        self.enter(RunStage::Loading);
        let train_set = load_dataset(self.config.train_dir(), DatasetRole::Train)?;
        let test_set = load_dataset(self.config.test_dir(), DatasetRole::Test)?;

        self.enter(RunStage::Training);
        let model = train(&self.classifier, &train_set, self.config.hyperparameters())?;

        self.enter(RunStage::Evaluating);
        let evaluation = evaluate(&model, &train_set, &test_set)?;

        self.enter(RunStage::Publishing);
        let publication = publish(&model, self.config.model_dir())?;

        Ok(StageOutputs {
            train_shape: DatasetShape::of(&train_set, DatasetRole::Train),
            test_shape: DatasetShape::of(&test_set, DatasetRole::Test),
            classes: train_set.classes(),
            evaluation,
            publication,
        })
    }

    fn enter(&mut self, stage: RunStage) {
        debug_assert!(!self.stage.is_terminal(), "left terminal stage {}", self.stage);
        self.stage = stage;
        self.history.push(stage);
        info!(%stage, "entering stage");
    }
}

/// Render an error and all of its sources as `outer: inner: ...`.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(error), |e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
