//! Headerless CSV dataset reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ClassLabel, Dataset};

/// Reads a labeled dataset from a headerless CSV file.
///
/// Expected CSV format:
/// - No header row; every line is a data row
/// - `x0,x1,...,xn,label`: all columns but the last are numeric features,
///   the last column is the class label (numeric or text)
/// - All rows must have the same number of columns, at least 2
///
/// Blank lines are skipped and cells are whitespace-trimmed.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::TooFewColumns`] | Row has fewer than 2 columns |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than the first row |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable float |
/// | [`IoError::EmptyLabel`] | Label cell is blank |
/// | [`IoError::EmptyDataset`] | Zero data rows |
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets ragged rows through to the InconsistentRowLength
        // check below instead of surfacing as a bare CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut expected_cols = None;

        for result in rdr.records() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            // Whitespace-only lines come through as a single empty field.
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row_index = labels.len();

            if record.len() < 2 {
                return Err(IoError::TooFewColumns {
                    path: self.path.clone(),
                    row_index,
                    got: record.len(),
                });
            }
            let expected = *expected_cols.get_or_insert(record.len());
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            let n_features = record.len() - 1;
            let mut row = Vec::with_capacity(n_features);
            for (col_index, raw) in record.iter().take(n_features).enumerate() {
                match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => row.push(value),
                    _ => {
                        return Err(IoError::NonFiniteValue {
                            path: self.path.clone(),
                            row_index,
                            col_index,
                            raw: raw.to_string(),
                        });
                    }
                }
            }

            let label = record
                .get(n_features)
                .and_then(ClassLabel::parse)
                .ok_or_else(|| IoError::EmptyLabel {
                    path: self.path.clone(),
                    row_index,
                })?;

            features.push(row);
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        debug!(n_rows = labels.len(), "parsed CSV records");

        let dataset = Dataset::new(features, labels)?;
        info!(
            n_rows = dataset.n_rows(),
            n_columns = dataset.n_columns(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}
