//! Confusion matrix and per-class classification metrics over class labels.

use std::collections::BTreeSet;
use std::fmt;

use canopy_io::ClassLabel;

use crate::error::ShapeError;

/// A confusion matrix for multi-class classification.
///
/// The class set is the union of true and predicted labels in
/// [`ClassLabel`] order. Entry `matrix[t][p]` counts samples with true class
/// `classes[t]` predicted as `classes[p]`.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    classes: Vec<ClassLabel>,
    matrix: Vec<Vec<usize>>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassMetrics {
    /// The class label.
    pub class: ClassLabel,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1_score: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from aligned true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ShapeError::Empty`] | Zero labels provided |
    /// | [`ShapeError::PredictionCount`] | `predicted.len() != true_labels.len()` |
    pub fn from_labels(
        true_labels: &[ClassLabel],
        predicted: &[ClassLabel],
    ) -> Result<Self, ShapeError> {
        if true_labels.is_empty() {
            return Err(ShapeError::Empty);
        }
        if predicted.len() != true_labels.len() {
            return Err(ShapeError::PredictionCount {
                expected: true_labels.len(),
                got: predicted.len(),
            });
        }

        let classes: Vec<ClassLabel> = true_labels
            .iter()
            .chain(predicted)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = |label: &ClassLabel| classes.partition_point(|c| c < label);

        let mut matrix = vec![vec![0usize; classes.len()]; classes.len()];
        for (t, p) in true_labels.iter().zip(predicted) {
            matrix[index(t)][index(p)] += 1;
        }
        Ok(Self { classes, matrix })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    /// Number of samples on the diagonal.
    #[must_use]
    pub fn correct(&self) -> usize {
        (0..self.n_classes()).map(|i| self.matrix[i][i]).sum()
    }

    /// Number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Per-class precision, recall, F1, and support, in class order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.n_classes();
        (0..n)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = (0..n).map(|i| self.matrix[i][c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.classes[c].clone(),
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect()
    }

    /// Class labels labelling the rows and columns.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.as_str().len())
            .chain(std::iter::once("true\\pred".len()))
            .max()
            .unwrap_or(0);

        write!(f, "{:>width$}", "true\\pred")?;
        for class in &self.classes {
            write!(f, " {:>width$}", class.as_str())?;
        }
        writeln!(f)?;

        for (class, row) in self.classes.iter().zip(&self.matrix) {
            write!(f, "{:>width$}", class.as_str())?;
            for val in row {
                write!(f, " {val:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
