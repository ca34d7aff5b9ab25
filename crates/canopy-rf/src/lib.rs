//! Random Forest classification: train, predict, save, load.
//!
//! A hand-rolled Random Forest of CART decision trees with Gini/Entropy split
//! criteria, bootstrap bagging, random feature subsets, parallel training via
//! rayon, seeded ChaCha RNGs for reproducibility, and versioned bincode model
//! files that carry the class names alongside the trees.

mod config;
mod error;
mod forest;
mod node;
mod predict;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use forest::RandomForest;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use serialize::FORMAT_VERSION;
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
