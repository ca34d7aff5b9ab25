//! Run configuration: hyperparameters plus the three job directories.

use std::path::{Path, PathBuf};

/// Number of trees when none is requested.
pub const DEFAULT_TREE_COUNT: usize = 100;

/// Seed for the forest's master RNG when none is requested.
pub const DEFAULT_RANDOM_SEED: u64 = 0;

/// Training log verbosity when none is requested.
pub const DEFAULT_VERBOSITY: u32 = 1;

/// Errors from building a run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Returned when fewer than one tree is requested.
    #[error("tree_count must be at least 1, got {tree_count}")]
    InvalidTreeCount {
        /// The rejected tree count.
        tree_count: usize,
    },
}

/// Hyperparameters forwarded to the fitting capability.
///
/// `verbosity` controls training logs: `0` keeps them at debug level, `1`
/// adds an info-level forest summary, `2` and above log every tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Hyperparameters {
    tree_count: usize,
    random_seed: u64,
    verbosity: u32,
}

impl Hyperparameters {
    /// Create hyperparameters with `tree_count` trees and default seed and
    /// verbosity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTreeCount`] if `tree_count` is 0.
    pub fn new(tree_count: usize) -> Result<Self, ConfigError> {
        if tree_count == 0 {
            return Err(ConfigError::InvalidTreeCount { tree_count });
        }
        Ok(Self {
            tree_count,
            random_seed: DEFAULT_RANDOM_SEED,
            verbosity: DEFAULT_VERBOSITY,
        })
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    /// Set the training log verbosity.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.tree_count
    }

    #[must_use]
    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    #[must_use]
    pub fn verbosity(&self) -> u32 {
        self.verbosity
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            tree_count: DEFAULT_TREE_COUNT,
            random_seed: DEFAULT_RANDOM_SEED,
            verbosity: DEFAULT_VERBOSITY,
        }
    }
}

/// Everything a run needs, assembled once at process start.
///
/// Immutable after construction; no pipeline component reads the
/// environment itself.
#[derive(Debug, Clone)]
pub struct RunConfig {
    hyperparameters: Hyperparameters,
    train_dir: PathBuf,
    test_dir: PathBuf,
    model_dir: PathBuf,
}

impl RunConfig {
    /// Bundle hyperparameters with the training, test and model directories.
    pub fn new(
        hyperparameters: Hyperparameters,
        train_dir: impl Into<PathBuf>,
        test_dir: impl Into<PathBuf>,
        model_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hyperparameters,
            train_dir: train_dir.into(),
            test_dir: test_dir.into(),
            model_dir: model_dir.into(),
        }
    }

    #[must_use]
    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    /// Directory holding `train.csv`.
    #[must_use]
    pub fn train_dir(&self) -> &Path {
        &self.train_dir
    }

    /// Directory holding `test.csv`.
    #[must_use]
    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    /// Directory the model artifact is written to.
    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let h = Hyperparameters::default();
        assert_eq!(h.tree_count(), 100);
        assert_eq!(h.random_seed(), 0);
        assert_eq!(h.verbosity(), 1);
        assert_eq!(Hyperparameters::new(DEFAULT_TREE_COUNT).unwrap(), h);
    }

    #[test]
    fn zero_trees_rejected() {
        let err = Hyperparameters::new(0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTreeCount { tree_count: 0 }));
    }

    #[test]
    fn builder_sets_fields() {
        let h = Hyperparameters::new(7)
            .unwrap()
            .with_random_seed(99)
            .with_verbosity(0);
        assert_eq!((h.tree_count(), h.random_seed(), h.verbosity()), (7, 99, 0));
    }

    #[test]
    fn run_config_paths() {
        let config = RunConfig::new(Hyperparameters::default(), "/data/train", "/data/test", "/out");
        assert_eq!(config.train_dir(), Path::new("/data/train"));
        assert_eq!(config.test_dir(), Path::new("/data/test"));
        assert_eq!(config.model_dir(), Path::new("/out"));
        assert_eq!(config.hyperparameters().tree_count(), 100);
    }
}
