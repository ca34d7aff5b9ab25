//! Configuration builder for Random Forest training.

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::split::SplitCriterion;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features, rounded up.
    Sqrt,
    /// Log base 2 of total features, rounded up (at least 1).
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve the strategy to a concrete feature count.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] when the count falls outside
    /// `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let n = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => n.sqrt().ceil() as usize,
            MaxFeatures::Log2 => n.log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n * f).ceil() as usize,
            MaxFeatures::Fixed(count) => count,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `criterion`         | `Gini`     |
/// | `seed`              | 0          |
/// | `verbosity`         | 0          |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) seed: u64,
    pub(crate) verbosity: u32,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            seed: 0,
            verbosity: 0,
        })
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how much training progress is logged.
    ///
    /// `0` keeps everything at debug level, `1` logs a summary per forest,
    /// `2` and above also log every tree.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the logging verbosity.
    #[must_use]
    pub fn verbosity(&self) -> u32 {
        self.verbosity
    }

    /// Train a Random Forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major; `labels[sample_idx]`
    /// is a zero-based index into `class_names`.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                              |
    /// |-----------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `features` is empty                               |
    /// | [`RfError::ZeroFeatures`]         | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths                    |
    /// | [`RfError::NonFiniteValue`]       | any value is NaN or infinite                      |
    /// | [`RfError::LabelCountMismatch`]   | `labels.len() != features.len()`                  |
    /// | [`RfError::LabelOutOfRange`]      | a label has no entry in `class_names`             |
    /// | [`RfError::SingleClass`]          | fewer than two distinct labels                    |
    /// | [`RfError::InvalidMaxFeatures`]   | resolved max_features is outside [1, n_features]  |
    /// | [`RfError::InvalidMaxDepth`]      | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                         |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                          |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        class_names: &[String],
    ) -> Result<RandomForest, RfError> {
        crate::forest::train(self, features, labels, class_names)
    }
}
