//! The narrow fit/predict/save seam and its random forest implementation.
//!
//! The pipeline only sees [`Classifier`], [`TrainedModel`] and
//! [`ModelArtifact`]; [`ForestClassifier`] plugs `canopy-rf` in behind them.

use std::collections::BTreeSet;
use std::path::Path;

use canopy_io::ClassLabel;
use canopy_rf::{RandomForest, RandomForestConfig, RfError, SplitCriterion};
use tracing::{debug, instrument};

use crate::config::Hyperparameters;
use crate::publisher::MODEL_FILE_NAME;

/// A fitted model that maps feature rows to class labels.
pub trait TrainedModel {
    /// Error raised when prediction fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of feature columns the model expects.
    fn n_features(&self) -> usize;

    /// Predict one label per row, in row order.
    ///
    /// # Errors
    ///
    /// Implementation-defined; typically a feature count mismatch.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<ClassLabel>, Self::Error>;
}

/// A model that can be written to a file.
pub trait ModelArtifact {
    /// Error raised when the write fails.
    type SaveError: std::error::Error + Send + Sync + 'static;

    /// Serialize the model to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Implementation-defined encoding or I/O failure.
    fn save(&self, path: &Path) -> Result<(), Self::SaveError>;
}

/// A learning algorithm: labeled rows in, trained model out.
pub trait Classifier {
    /// Model produced by [`Classifier::fit`].
    type Model: TrainedModel + ModelArtifact;
    /// Error raised when fitting fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Human-readable algorithm name for logs and summaries.
    fn name(&self) -> &'static str;

    /// Fit a model on row-major `features` and aligned `labels`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; a classifier must reject data it cannot fit
    /// (for example a single distinct label) instead of returning a model.
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[ClassLabel],
        hyperparameters: &Hyperparameters,
    ) -> Result<Self::Model, Self::Error>;
}

/// Random forest classifier backed by `canopy-rf`.
///
/// Tree count, seed and verbosity come from [`Hyperparameters`]; the
/// remaining forest settings keep their defaults (`sqrt` feature subsets,
/// unlimited depth, bootstrap bagging).
#[derive(Debug, Clone, Copy)]
pub struct ForestClassifier {
    criterion: SplitCriterion,
}

impl ForestClassifier {
    /// Create a Gini forest classifier.
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
        }
    }

    /// Set the split criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }
}

impl Default for ForestClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for ForestClassifier {
    type Model = ForestModel;
    type Error = RfError;

    fn name(&self) -> &'static str {
        "random_forest"
    }

    /// Encode labels to dense indices in [`ClassLabel`] order and fit a forest.
    ///
    /// # Errors
    ///
    /// Any [`RfError`] from [`RandomForestConfig::new`] or
    /// [`RandomForestConfig::fit`], notably [`RfError::SingleClass`].
    #[instrument(skip_all, fields(n_rows = features.len(), tree_count = hyperparameters.tree_count()))]
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[ClassLabel],
        hyperparameters: &Hyperparameters,
    ) -> Result<ForestModel, RfError> {
        let classes: Vec<ClassLabel> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let encoded: Vec<usize> = labels
            .iter()
            .map(|label| classes.partition_point(|c| c < label))
            .collect();
        let class_names: Vec<String> = classes.iter().map(|c| c.as_str().to_string()).collect();
        debug!(n_classes = classes.len(), "encoded labels");

        let forest = RandomForestConfig::new(hyperparameters.tree_count())?
            .with_seed(hyperparameters.random_seed())
            .with_verbosity(hyperparameters.verbosity())
            .with_criterion(self.criterion)
            .fit(features, &encoded, &class_names)?;

        Ok(ForestModel { forest, classes })
    }
}

/// A trained random forest together with its class labels.
#[derive(Debug, Clone)]
pub struct ForestModel {
    forest: RandomForest,
    classes: Vec<ClassLabel>,
}

impl ForestModel {
    /// Load `model_dir/model.joblib` written by a previous run.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file missing or unreadable |
    /// | [`RfError::DeserializeModel`] | file is not a model artifact |
    /// | [`RfError::IncompatibleModelVersion`] | artifact written by another format version |
    /// | [`RfError::InvalidClassName`] | a stored class name is not a normalized label |
    pub fn from_model_dir(model_dir: &Path) -> Result<Self, RfError> {
        Self::load(&model_dir.join(MODEL_FILE_NAME))
    }

    /// Load a model artifact from an explicit file path.
    ///
    /// # Errors
    ///
    /// Same as [`ForestModel::from_model_dir`].
    pub fn load(path: &Path) -> Result<Self, RfError> {
        let forest = RandomForest::load(path)?;
        // Stored names are already normalized, so parsing must be the identity.
        let classes = forest
            .class_names()
            .iter()
            .enumerate()
            .map(|(index, name)| {
                ClassLabel::parse(name)
                    .filter(|label| label.as_str() == name)
                    .ok_or_else(|| RfError::InvalidClassName {
                        path: path.to_path_buf(),
                        index,
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { forest, classes })
    }

    /// Class labels in index order.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// The underlying forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

impl TrainedModel for ForestModel {
    type Error = RfError;

    fn n_features(&self) -> usize {
        self.forest.n_features()
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<ClassLabel>, RfError> {
        let n_classes = self.classes.len();
        self.forest
            .predict_batch(features)?
            .into_iter()
            .enumerate()
            .map(|(sample_index, class)| {
                self.classes
                    .get(class)
                    .cloned()
                    .ok_or_else(|| RfError::LabelOutOfRange {
                        sample_index,
                        label: class,
                        n_classes,
                    })
            })
            .collect()
    }
}

impl ModelArtifact for ForestModel {
    type SaveError = RfError;

    fn save(&self, path: &Path) -> Result<(), RfError> {
        self.forest.save(path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(raw: &str) -> ClassLabel {
        ClassLabel::parse(raw).unwrap()
    }

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<ClassLabel>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let jitter = f64::from(i % 5) * 0.05;
            features.push(vec![1.0 + jitter, 2.0 - jitter]);
            labels.push(label("low"));
            features.push(vec![5.0 - jitter, 0.5 + jitter]);
            labels.push(label("high"));
        }
        (features, labels)
    }

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters::new(15).unwrap().with_random_seed(3).with_verbosity(0)
    }

    #[test]
    fn predictions_use_original_labels() {
        let (features, labels) = two_blobs();
        let model = ForestClassifier::new()
            .fit(&features, &labels, &hyperparameters())
            .unwrap();

        assert_eq!(model.n_features(), 2);
        assert_eq!(model.classes(), &[label("high"), label("low")]);
        let predicted = model.predict(&[vec![1.0, 2.0], vec![5.0, 0.5]]).unwrap();
        assert_eq!(predicted, vec![label("low"), label("high")]);
    }

    #[test]
    fn numeric_classes_ordered_numerically() {
        let features = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![label("10"), label("9"), label("10"), label("9")];
        let model = ForestClassifier::new()
            .fit(&features, &labels, &hyperparameters())
            .unwrap();
        assert_eq!(model.classes(), &[label("9"), label("10")]);
    }

    #[test]
    fn single_class_rejected() {
        let features = vec![vec![0.0], vec![1.0]];
        let labels = vec![label("a"), label("a")];
        let err = ForestClassifier::new()
            .fit(&features, &labels, &hyperparameters())
            .unwrap_err();
        assert!(matches!(err, RfError::SingleClass { .. }));
    }

    #[test]
    fn wrong_width_prediction_rejected() {
        let (features, labels) = two_blobs();
        let model = ForestClassifier::new()
            .fit(&features, &labels, &hyperparameters())
            .unwrap();
        let err = model.predict(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, RfError::PredictionFeatureMismatch { .. }));
    }

    #[test]
    fn reload_from_model_dir() {
        let (features, labels) = two_blobs();
        let model = ForestClassifier::new()
            .with_criterion(SplitCriterion::Entropy)
            .fit(&features, &labels, &hyperparameters())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        model.save(&dir.path().join(MODEL_FILE_NAME)).unwrap();
        let loaded = ForestModel::from_model_dir(dir.path()).unwrap();

        assert_eq!(loaded.classes(), model.classes());
        assert_eq!(loaded.predict(&features).unwrap(), model.predict(&features).unwrap());
    }

    #[test]
    fn blank_stored_class_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE_NAME);
        let names = vec!["a".to_string(), "  ".to_string(), "c".to_string()];
        RandomForestConfig::new(3)
            .unwrap()
            .fit(&[vec![0.0], vec![1.0], vec![2.0]], &[0, 1, 2], &names)
            .unwrap()
            .save(&path)
            .unwrap();

        let err = ForestModel::load(&path).unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidClassName { index: 1, ref name, .. } if name == "  "
        ));
    }

    #[test]
    fn unnormalized_stored_class_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["1.0".to_string(), "2".to_string()];
        RandomForestConfig::new(3)
            .unwrap()
            .fit(&[vec![0.0], vec![1.0]], &[0, 1], &names)
            .unwrap()
            .save(&dir.path().join(MODEL_FILE_NAME))
            .unwrap();

        let err = ForestModel::from_model_dir(dir.path()).unwrap_err();
        assert!(matches!(err, RfError::InvalidClassName { index: 0, .. }));
    }

    #[test]
    fn failed_save_leaves_no_partial_artifact() {
        let (features, labels) = two_blobs();
        let model = ForestClassifier::new()
            .fit(&features, &labels, &hyperparameters())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = model
            .save(&dir.path().join("absent").join(MODEL_FILE_NAME))
            .unwrap_err();
        assert!(matches!(err, RfError::WriteModel { .. }));
        assert!(!dir.path().join(MODEL_FILE_NAME).exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_artifact_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ForestModel::from_model_dir(dir.path()).unwrap_err();
        assert!(matches!(err, RfError::ReadModel { .. }));
    }
}
