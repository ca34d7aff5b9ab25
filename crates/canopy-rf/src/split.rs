//! Split criteria and exhaustive threshold search.

use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Zero samples count as pure.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let proportions = class_counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| c as f64 / n);
        let value = match self {
            SplitCriterion::Gini => 1.0 - proportions.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -proportions.map(|p| p * p.ln()).sum::<f64>(),
        };
        Impurity::new(value.max(0.0))
    }
}

/// Best split found for one node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Weighted impurity decrease, `n·I(parent) - n_l·I(left) - n_r·I(right)`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Inputs shared by every split search inside one tree.
pub(crate) struct SplitSearch<'a> {
    /// Column-major: `columns[feature_idx][sample_idx]`.
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    /// Find the best split over a random subset of `max_features` features.
    ///
    /// Each candidate feature is sorted once and scanned left to right with
    /// incremental class counts; thresholds sit halfway between consecutive
    /// distinct values. Returns `None` when every candidate feature is constant
    /// over `sample_indices` or no boundary satisfies `min_samples_leaf`.
    pub(crate) fn best_split(
        &self,
        sample_indices: &[usize],
        rng: &mut impl Rng,
    ) -> Option<SplitResult> {
        let n_features = self.columns.len();
        let n_samples = sample_indices.len();
        if n_samples < 2 || n_features == 0 {
            return None;
        }

        let mut parent_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            parent_counts[self.labels[si]] += 1;
        }
        let parent_impurity = self.criterion.impurity(&parent_counts, n_samples).value();

        // Partial Fisher-Yates over the feature order.
        let take = self.max_features.min(n_features);
        let mut feature_order: Vec<usize> = (0..n_features).collect();
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }

        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

        for &feat_idx in &feature_order[..take] {
            let column = &self.columns[feat_idx];
            sorted.clear();
            sorted.extend(sample_indices.iter().map(|&si| (column[si], si)));
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.clone();

            for i in 0..n_samples - 1 {
                let (value, si) = sorted[i];
                left_counts[self.labels[si]] += 1;
                right_counts[self.labels[si]] -= 1;

                let next_value = sorted[i + 1].0;
                if value == next_value {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n_samples - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let left = self.criterion.impurity(&left_counts, n_left).value();
                let right = self.criterion.impurity(&right_counts, n_right).value();
                let decrease = n_samples as f64 * parent_impurity
                    - n_left as f64 * left
                    - n_right as f64 * right;

                if best.is_none_or(|(_, _, d)| decrease > d) {
                    best = Some((feat_idx, threshold_between(value, next_value), decrease));
                }
            }
        }

        let (feat_idx, threshold, impurity_decrease) = best?;
        let column = &self.columns[feat_idx];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
            .iter()
            .copied()
            .partition(|&si| column[si] <= threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return None;
        }

        Some(SplitResult {
            feature: FeatureIndex::new(feat_idx),
            threshold,
            impurity_decrease,
            left_indices,
            right_indices,
        })
    }
}

/// Midpoint of two consecutive sorted values, kept strictly below `next`.
///
/// Halving before adding avoids overflow near `f64::MAX`. When `value` and
/// `next` are adjacent floats the midpoint rounds up to `next`, so `value`
/// itself is used instead.
fn threshold_between(value: f64, next: f64) -> f64 {
    let mid = value / 2.0 + next / 2.0;
    if mid < next { mid } else { value }
}
