//! Arena node types for fitted decision trees.

use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based column position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Position of a node inside a tree's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Impurity of the samples that reached a node, under the tree's criterion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` when every sample at the node shares one class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`]; the root always sits at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node: samples with `sample[feature] <= threshold` go left.
    Split {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: Impurity,
        n_samples: usize,
    },
    /// Terminal node holding the class distribution of its training samples.
    Leaf {
        /// Class with the highest count (lowest index wins ties).
        prediction: usize,
        /// Class probabilities, one entry per class, summing to 1.0.
        distribution: Vec<f64>,
        impurity: Impurity,
        n_samples: usize,
    },
}

impl Node {
    /// Build a leaf from per-class sample counts.
    pub(crate) fn leaf(class_counts: &[usize], impurity: Impurity) -> Self {
        let n_samples: usize = class_counts.iter().sum();
        let total = n_samples.max(1) as f64;
        let distribution = class_counts.iter().map(|&c| c as f64 / total).collect();
        let mut prediction = 0;
        for (class, &count) in class_counts.iter().enumerate() {
            if count > class_counts[prediction] {
                prediction = class;
            }
        }
        Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
        }
    }

    /// Return the impurity at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_distribution_sums_to_one() {
        let node = Node::leaf(&[3, 1], Impurity::new(0.375));
        let Node::Leaf {
            prediction,
            distribution,
            n_samples,
            ..
        } = node
        else {
            panic!("expected leaf");
        };
        assert_eq!(prediction, 0);
        assert_eq!(n_samples, 4);
        assert!((distribution.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((distribution[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn leaf_tie_prefers_lowest_class() {
        let node = Node::leaf(&[0, 2, 2], Impurity::new(0.5));
        assert!(matches!(node, Node::Leaf { prediction: 1, .. }));
    }

    #[test]
    fn feature_index_display() {
        assert_eq!(FeatureIndex::new(3).to_string(), "f3");
    }

    #[test]
    fn zero_impurity_is_pure() {
        assert!(Impurity::new(0.0).is_pure());
        assert!(!Impurity::new(0.1).is_pure());
    }
}
