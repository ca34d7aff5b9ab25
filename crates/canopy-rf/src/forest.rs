//! Random Forest training with parallel tree construction.

use std::time::Instant;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) class_names: Vec<String>,
}

/// Check shape, alignment and finiteness of a training matrix.
///
/// Returns the feature count shared by every row.
pub(crate) fn validate_matrix(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Draw `n_samples` indices with replacement.
fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    class_names: &[String],
) -> Result<RandomForest, RfError> {
    let n_features = validate_matrix(features, labels)?;
    let n_samples = features.len();
    let n_classes = class_names.len();

    if let Some((sample_index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
    {
        return Err(RfError::LabelOutOfRange {
            sample_index,
            label,
            n_classes,
        });
    }
    let first_label = labels[0];
    if labels.iter().all(|&l| l == first_label) {
        return Err(RfError::SingleClass {
            class: class_names[first_label].clone(),
        });
    }

    let max_features = config.max_features.resolve(n_features)?;
    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features))
        .with_n_classes(Some(n_classes));

    let verbosity = config.verbosity;
    let n_trees = config.n_trees;
    let started = Instant::now();

    // Per-tree seeds come from one master RNG so results do not depend on
    // which worker thread builds which tree.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..n_trees).map(|_| master_rng.r#gen()).collect();

    let trees = tree_seeds
        .into_par_iter()
        .enumerate()
        .map(|(tree_idx, seed)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bag = bootstrap_indices(n_samples, &mut rng);
            let bag_features: Vec<Vec<f64>> = bag.iter().map(|&i| features[i].clone()).collect();
            let bag_labels: Vec<usize> = bag.iter().map(|&i| labels[i]).collect();

            let tree = tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit(&bag_features, &bag_labels)?;

            if verbosity >= 2 {
                info!(
                    tree = tree_idx + 1,
                    of = n_trees,
                    n_nodes = tree.n_nodes(),
                    depth = tree.depth(),
                    "tree built"
                );
            }
            Ok(tree)
        })
        .collect::<Result<Vec<DecisionTree>, RfError>>()?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if verbosity >= 1 {
        info!(
            n_trees,
            n_samples,
            n_features,
            n_classes,
            max_features,
            elapsed_ms,
            "random forest trained"
        );
    } else {
        debug!(n_trees, n_samples, n_features, n_classes, elapsed_ms, "random forest trained");
    }

    Ok(RandomForest {
        trees,
        n_features,
        class_names: class_names.to_vec(),
    })
}
