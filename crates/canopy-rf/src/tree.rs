//! CART decision trees stored as index-linked arenas.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Node, NodeIndex},
    split::{SplitCriterion, SplitSearch},
};

/// Configuration for a single CART decision tree.
///
/// # Defaults
///
/// | Parameter           | Default                      |
/// |---------------------|------------------------------|
/// | `criterion`         | `Gini`                       |
/// | `max_depth`         | `None` (unlimited)           |
/// | `min_samples_split` | 2                            |
/// | `min_samples_leaf`  | 1                            |
/// | `max_features`      | `None` (all features)        |
/// | `n_classes`         | `None` (largest label + 1)   |
/// | `seed`              | 0                            |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 0,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum depth (root is depth 0). `None` grows until leaves are
    /// pure or too small to split.
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

    /// Set the number of features drawn at each split. `None` uses all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the width of leaf distributions.
    ///
    /// A forest sets this so that trees grown on bootstrap samples missing the
    /// highest class still agree on the class count.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed for feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a decision tree on row-major `features` and zero-based `labels`.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                            |
    /// |-------------------------------------|-------------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                             |
    /// | [`RfError::ZeroFeatures`]           | rows have zero feature columns                  |
    /// | [`RfError::LabelCountMismatch`]     | `labels.len() != features.len()`                |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths                  |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite                    |
    /// | [`RfError::LabelOutOfRange`]        | a label is `>= n_classes`                       |
    /// | [`RfError::InvalidMaxFeatures`]     | `max_features` outside [1, n_features]          |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                        |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                         |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                          |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let n_features = crate::forest::validate_matrix(features, labels)?;
        self.validate(n_features)?;

        let n_classes = self
            .n_classes
            .unwrap_or_else(|| labels.iter().max().map_or(1, |&m| m + 1));
        if let Some((sample_index, &label)) =
            labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
        {
            return Err(RfError::LabelOutOfRange {
                sample_index,
                label,
                n_classes,
            });
        }

        // Column-major copy so each split scan walks contiguous memory.
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let mut builder = TreeBuilder {
            search: SplitSearch {
                columns: &columns,
                labels,
                n_classes,
                criterion: self.criterion,
                max_features: self.max_features.unwrap_or(n_features),
                min_samples_leaf: self.min_samples_leaf,
            },
            config: self,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        let all_samples: Vec<usize> = (0..features.len()).collect();
        builder.grow(&all_samples, 0);

        debug!(n_nodes = builder.arena.len(), n_classes, "decision tree built");

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
            n_classes,
        })
    }

    fn validate(&self, n_features: usize) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive growth state for one tree.
struct TreeBuilder<'a> {
    search: SplitSearch<'a>,
    config: &'a DecisionTreeConfig,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `samples` and return its root index.
    fn grow(&mut self, samples: &[usize], depth: usize) -> NodeIndex {
        let mut class_counts = vec![0usize; self.search.n_classes];
        for &si in samples {
            class_counts[self.search.labels[si]] += 1;
        }
        let impurity = self.config.criterion.impurity(&class_counts, samples.len());

        let at_depth_limit = self.config.max_depth.is_some_and(|d| depth >= d);
        let too_small = samples.len() < self.config.min_samples_split;
        let split = if at_depth_limit || too_small || impurity.is_pure() {
            None
        } else {
            self.search
                .best_split(samples, &mut self.rng)
                .filter(|s| !s.left_indices.is_empty() && !s.right_indices.is_empty())
        };

        let node_idx = self.arena.len();
        self.arena.push(Node::leaf(&class_counts, impurity));

        // The leaf pushed above is the placeholder the split overwrites.
        if let Some(split) = split {
            let left = self.grow(&split.left_indices, depth + 1);
            let right = self.grow(&split.right_indices, depth + 1);
            self.arena[node_idx] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
                impurity,
                n_samples: samples.len(),
            };
        }

        NodeIndex::new(node_idx)
    }
}

/// A fitted CART decision tree.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class index for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("leaf_for always ends at a leaf"),
        }
    }

    /// Return the class distribution of the leaf `sample` falls into.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("leaf_for always ends at a leaf"),
        }
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the width of the leaf distributions.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the depth of the deepest leaf; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn leaf_for(&self, sample: &[f64]) -> Result<&Node, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut node = &self.nodes[0];
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = node
        {
            let next = if sample[feature.index()] <= *threshold {
                left
            } else {
                right
            };
            node = &self.nodes[next.index()];
        }
        Ok(node)
    }
}
