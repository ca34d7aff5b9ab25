//! Domain types for canopy-io.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::IoError;

/// A categorical class label read from the last column of a dataset.
///
/// Numeric labels are normalized on construction, so `1`, `1.0` and ` 1.00 `
/// are the same class. Numeric labels order numerically and sort before
/// non-numeric labels, which order lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ClassLabel(String);

impl ClassLabel {
    /// Parse a label cell. Returns `None` for a blank cell.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let text = match trimmed.parse::<f64>() {
            // `+ 0.0` folds -0.0 into 0.0.
            Ok(value) if value.is_finite() => (value + 0.0).to_string(),
            _ => trimmed.to_string(),
        };
        Some(Self(text))
    }

    /// Return the normalized label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Ord for ClassLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ClassLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two input datasets a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetRole {
    /// Data the model is fitted on.
    Train,
    /// Held-out data the model is scored on.
    Test,
}

impl DatasetRole {
    /// Fixed file name of this dataset inside its directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetRole::Train => "train.csv",
            DatasetRole::Test => "test.csv",
        }
    }
}

impl fmt::Display for DatasetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatasetRole::Train => "train",
            DatasetRole::Test => "test",
        })
    }
}

/// A labeled tabular dataset.
///
/// `features[i]` and `labels[i]` describe the same row; every feature row has
/// the same width.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    labels: Vec<ClassLabel>,
    n_features: usize,
}

impl Dataset {
    /// Assemble a dataset from row-major features and aligned labels.
    ///
    /// An empty dataset has zero features.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MisalignedLabels`] | `features.len() != labels.len()` |
    /// | [`IoError::RaggedFeatures`] | a row is wider or narrower than the first |
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<ClassLabel>) -> Result<Self, IoError> {
        if features.len() != labels.len() {
            return Err(IoError::MisalignedLabels {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }
        let n_features = features.first().map_or(0, Vec::len);
        if let Some((row_index, row)) = features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_features)
        {
            return Err(IoError::RaggedFeatures {
                row_index,
                expected: n_features,
                got: row.len(),
            });
        }
        Ok(Self {
            features,
            labels,
            n_features,
        })
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the labels, aligned with [`Dataset::features`].
    #[must_use]
    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of columns in the source table (features + label).
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.n_features + 1
    }

    /// `true` when the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count rows per label, in label order.
    #[must_use]
    pub fn class_counts(&self) -> BTreeMap<ClassLabel, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct labels, in label order.
    #[must_use]
    pub fn classes(&self) -> Vec<ClassLabel> {
        self.class_counts().into_keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(raw: &str) -> ClassLabel {
        ClassLabel::parse(raw).unwrap()
    }

    #[test]
    fn numeric_labels_normalize() {
        assert_eq!(label("1"), label("1.0"));
        assert_eq!(label(" 1.00 "), label("1"));
        assert_eq!(label("-0").as_str(), "0");
        assert_eq!(label("2.50").as_str(), "2.5");
    }

    #[test]
    fn blank_label_is_none() {
        assert!(ClassLabel::parse("   ").is_none());
    }

    #[test]
    fn text_labels_keep_case() {
        assert_eq!(label(" Fraud ").as_str(), "Fraud");
        assert_ne!(label("Fraud"), label("fraud"));
    }

    #[test]
    fn numeric_order_before_text() {
        let mut labels = vec![label("10"), label("b"), label("2"), label("a"), label("-1")];
        labels.sort();
        let ordered: Vec<&str> = labels.iter().map(ClassLabel::as_str).collect();
        assert_eq!(ordered, ["-1", "2", "10", "a", "b"]);
    }

    #[test]
    fn nan_label_is_text() {
        let mut labels = vec![label("NaN"), label("3")];
        labels.sort();
        assert_eq!(labels[0].as_str(), "3");
    }

    #[test]
    fn role_file_names() {
        assert_eq!(DatasetRole::Train.file_name(), "train.csv");
        assert_eq!(DatasetRole::Test.file_name(), "test.csv");
        assert_eq!(DatasetRole::Test.to_string(), "test");
    }

    #[test]
    fn dataset_shape_and_counts() {
        let ds = Dataset::new(
            vec![vec![1.0, 2.0], vec![2.0, 1.0], vec![1.5, 1.5]],
            vec![label("0"), label("1"), label("0")],
        )
        .unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.n_columns(), 3);
        let counts = ds.class_counts();
        assert_eq!(counts[&label("0")], 2);
        assert_eq!(counts[&label("1")], 1);
        assert_eq!(ds.classes(), vec![label("0"), label("1")]);
    }

    #[test]
    fn empty_dataset_allowed() {
        let ds = Dataset::new(vec![], vec![]).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.n_features(), 0);
    }

    #[test]
    fn misaligned_labels_rejected() {
        let err = Dataset::new(vec![vec![1.0]], vec![]).unwrap_err();
        assert!(matches!(err, IoError::MisalignedLabels { n_rows: 1, n_labels: 0 }));
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = Dataset::new(vec![vec![1.0, 2.0], vec![1.0]], vec![label("a"), label("b")])
            .unwrap_err();
        assert!(matches!(err, IoError::RaggedFeatures { row_index: 1, expected: 2, got: 1 }));
    }
}
