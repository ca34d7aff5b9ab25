//! Evaluator: accuracy on both datasets and a per-class report on the test set.

use std::fmt;

use canopy_io::{ClassLabel, Dataset, DatasetRole};
use tracing::{debug, info, instrument};

use crate::classifier::TrainedModel;
use crate::confusion::{ClassMetrics, ConfusionMatrix};
use crate::error::{PipelineError, ShapeError};

/// Unweighted or support-weighted mean of per-class metrics.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Per-class precision/recall/F1 with accuracy and averages.
///
/// Renders as the familiar fixed-width table:
///
/// ```text
///               precision    recall  f1-score   support
///
///            0       1.00      0.50      0.67         2
///            1       0.67      1.00      0.80         2
///
///     accuracy                           0.75         4
///    macro avg       0.83      0.75      0.73         4
/// weighted avg       0.83      0.75      0.73         4
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassificationReport {
    classes: Vec<ClassMetrics>,
    accuracy: f64,
    macro_avg: AverageMetrics,
    weighted_avg: AverageMetrics,
    support: usize,
}

impl ClassificationReport {
    /// Summarize a confusion matrix.
    #[must_use]
    pub fn from_confusion(confusion: &ConfusionMatrix) -> Self {
        let classes = confusion.class_metrics();
        let support: usize = classes.iter().map(|m| m.support).sum();

        let n = classes.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: classes.iter().map(|m| m.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|m| m.f1_score).sum::<f64>() / n,
        };

        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            if support == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|m| metric(m) * m.support as f64)
                    .sum::<f64>()
                    / support as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1_score: weighted(|m| m.f1_score),
        };

        Self {
            accuracy: confusion.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
            support,
        }
    }

    /// Per-class rows in class order.
    #[must_use]
    pub fn classes(&self) -> &[ClassMetrics] {
        &self.classes
    }

    /// Metrics for one class, if it appears in the report.
    #[must_use]
    pub fn class(&self, label: &ClassLabel) -> Option<&ClassMetrics> {
        self.classes.iter().find(|m| &m.class == label)
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[must_use]
    pub fn macro_avg(&self) -> AverageMetrics {
        self.macro_avg
    }

    #[must_use]
    pub fn weighted_avg(&self) -> AverageMetrics {
        self.weighted_avg
    }

    /// Total number of true samples.
    #[must_use]
    pub fn support(&self) -> usize {
        self.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WEIGHTED: &str = "weighted avg";
        let width = self
            .classes
            .iter()
            .map(|m| m.class.as_str().len())
            .chain(std::iter::once(WEIGHTED.len()))
            .max()
            .unwrap_or(WEIGHTED.len());

        write!(f, "{:>width$} ", "")?;
        for header in ["precision", "recall", "f1-score", "support"] {
            write!(f, " {header:>9}")?;
        }
        writeln!(f)?;
        writeln!(f)?;

        for m in &self.classes {
            let name = m.class.as_str();
            write_row(f, width, name, m.precision, m.recall, m.f1_score, m.support)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        let m = self.macro_avg;
        write_row(f, width, "macro avg", m.precision, m.recall, m.f1_score, self.support)?;
        let w = self.weighted_avg;
        write_row(f, width, WEIGHTED, w.precision, w.recall, w.f1_score, self.support)
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    width: usize,
    name: &str,
    precision: f64,
    recall: f64,
    f1_score: f64,
    support: usize,
) -> fmt::Result {
    writeln!(
        f,
        "{name:>width$}  {precision:>9.2} {recall:>9.2} {f1_score:>9.2} {support:>9}"
    )
}

/// Accuracy on both datasets plus the test-set classification report.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EvaluationReport {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub test_report: ClassificationReport,
}

/// Score `model` on the training and test datasets.
///
/// Logs both accuracies at info level, the test classification report at
/// info level and the test confusion matrix at debug level.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDatasetShape`] naming the offending
/// dataset when it:
///
/// | [`ShapeError`] | Condition |
/// |---|---|
/// | [`ShapeError::Empty`] | has no rows |
/// | [`ShapeError::FeatureMismatch`] | has a different feature count than the model |
/// | [`ShapeError::Prediction`] | is rejected by the model's `predict` |
/// | [`ShapeError::PredictionCount`] | gets a prediction count different from its row count |
#[instrument(skip_all, fields(train_rows = train.n_rows(), test_rows = test.n_rows()))]
pub fn evaluate<M: TrainedModel>(
    model: &M,
    train: &Dataset,
    test: &Dataset,
) -> Result<EvaluationReport, PipelineError> {
    let train_confusion = confusion_for(model, train, DatasetRole::Train)?;
    let test_confusion = confusion_for(model, test, DatasetRole::Test)?;

    let train_accuracy = train_confusion.accuracy();
    let test_accuracy = test_confusion.accuracy();
    let test_report = ClassificationReport::from_confusion(&test_confusion);

    info!(accuracy = %format!("{train_accuracy:.4}"), "training accuracy");
    info!(accuracy = %format!("{test_accuracy:.4}"), "test accuracy");
    info!("classification report (test):\n{test_report}");
    debug!("confusion matrix (test):\n{test_confusion}");

    Ok(EvaluationReport {
        train_accuracy,
        test_accuracy,
        test_report,
    })
}

fn confusion_for<M: TrainedModel>(
    model: &M,
    dataset: &Dataset,
    role: DatasetRole,
) -> Result<ConfusionMatrix, PipelineError> {
    let shape_error = |source| PipelineError::InvalidDatasetShape { role, source };

    if dataset.is_empty() {
        return Err(shape_error(ShapeError::Empty));
    }
    if dataset.n_features() != model.n_features() {
        return Err(shape_error(ShapeError::FeatureMismatch {
            expected: model.n_features(),
            got: dataset.n_features(),
        }));
    }

    let predicted = model.predict(dataset.features()).map_err(|e| {
        shape_error(ShapeError::Prediction {
            source: Box::new(e),
        })
    })?;
    ConfusionMatrix::from_labels(dataset.labels(), &predicted).map_err(shape_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(raw: &str) -> ClassLabel {
        ClassLabel::parse(raw).unwrap()
    }

    fn labels(raw: &[&str]) -> Vec<ClassLabel> {
        raw.iter().map(|r| label(r)).collect()
    }

    /// Predicts from a fixed threshold on feature 0.
    struct Threshold;

    impl TrainedModel for Threshold {
        type Error = std::convert::Infallible;

        fn n_features(&self) -> usize {
            1
        }

        fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<ClassLabel>, Self::Error> {
            Ok(features
                .iter()
                .map(|row| if row[0] < 0.5 { label("0") } else { label("1") })
                .collect())
        }
    }

    fn dataset(values: &[f64], raw_labels: &[&str]) -> Dataset {
        Dataset::new(values.iter().map(|&v| vec![v]).collect(), labels(raw_labels)).unwrap()
    }

    #[test]
    fn accuracies_in_unit_interval() {
        let train = dataset(&[0.1, 0.9, 0.2, 0.8], &["0", "1", "0", "1"]);
        let test = dataset(&[0.1, 0.9, 0.6, 0.4], &["0", "1", "0", "1"]);
        let report = evaluate(&Threshold, &train, &test).unwrap();

        assert_eq!(report.train_accuracy, 1.0);
        assert_eq!(report.test_accuracy, 0.5);
        assert_eq!(report.test_report.accuracy(), 0.5);
        assert_eq!(report.test_report.support(), 4);
    }

    #[test]
    fn empty_test_set_is_shape_error() {
        let train = dataset(&[0.1, 0.9], &["0", "1"]);
        let test = Dataset::new(vec![], vec![]).unwrap();
        let err = evaluate(&Threshold, &train, &test).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidDatasetShape {
                role: DatasetRole::Test,
                source: ShapeError::Empty
            }
        ));
    }

    #[test]
    fn feature_mismatch_is_shape_error() {
        let train = dataset(&[0.1, 0.9], &["0", "1"]);
        let test = Dataset::new(vec![vec![0.1, 0.2]], labels(&["0"])).unwrap();
        let err = evaluate(&Threshold, &train, &test).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidDatasetShape {
                role: DatasetRole::Test,
                source: ShapeError::FeatureMismatch { expected: 1, got: 2 }
            }
        ));
    }

    #[test]
    fn report_includes_predicted_only_class() {
        let train = dataset(&[0.1, 0.9], &["0", "1"]);
        let test = dataset(&[0.1, 0.9, 0.2], &["0", "0", "0"]);
        let report = evaluate(&Threshold, &train, &test).unwrap().test_report;

        let one = report.class(&label("1")).unwrap();
        assert_eq!(one.support, 0);
        assert_eq!(one.precision, 0.0);
        assert_eq!(report.classes().len(), 2);
    }

    #[test]
    fn averages() {
        let truth = labels(&["0", "0", "1", "1"]);
        let predicted = labels(&["0", "1", "1", "1"]);
        let cm = ConfusionMatrix::from_labels(&truth, &predicted).unwrap();
        let report = ClassificationReport::from_confusion(&cm);

        // class 0: p=1, r=0.5; class 1: p=2/3, r=1
        let macro_avg = report.macro_avg();
        assert!((macro_avg.precision - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert!((macro_avg.recall - 0.75).abs() < 1e-12);
        // Equal supports make weighted and macro averages agree.
        assert!((report.weighted_avg().f1_score - macro_avg.f1_score).abs() < 1e-12);
    }

    #[test]
    fn report_table_layout() {
        let truth = labels(&["0", "0", "1", "1"]);
        let predicted = labels(&["0", "1", "1", "1"]);
        let cm = ConfusionMatrix::from_labels(&truth, &predicted).unwrap();
        let table = ClassificationReport::from_confusion(&cm).to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(
            lines[0],
            "              precision    recall  f1-score   support"
        );
        assert_eq!(lines[1], "");
        assert_eq!(
            lines[2],
            "           0       1.00      0.50      0.67         2"
        );
        assert_eq!(
            lines[5],
            "    accuracy                           0.75         4"
        );
        assert_eq!(
            lines[7],
            "weighted avg       0.83      0.75      0.73         4"
        );
    }
}
