//! I/O error types for canopy-io.

use std::path::PathBuf;

/// Errors from reading and validating a labeled dataset.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file holds no data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a row lacks room for at least one feature plus the label.
    #[error("row {row_index} in {path} has {got} column(s); at least 2 are required (features + label)")]
    TooFewColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Number of columns found.
        got: usize,
    },

    /// Returned when a row has a different number of columns than the first row.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Column count of the first row.
        expected: usize,
        /// Column count of this row.
        got: usize,
    },

    /// Returned when a feature cell is NaN, Inf, or not a float at all.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the label cell of a row is blank.
    #[error("empty label in {path}: row {row_index}")]
    EmptyLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
    },

    /// Returned when a dataset is assembled from features and labels of different lengths.
    #[error("{n_rows} feature rows but {n_labels} labels")]
    MisalignedLabels {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a dataset is assembled from rows of different widths.
    #[error("feature row {row_index} has {got} values, expected {expected}")]
    RaggedFeatures {
        /// Zero-based row index.
        row_index: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        got: usize,
    },
}
