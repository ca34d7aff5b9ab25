//! Accuracy regression tests for canopy-rf.
//!
//! These tests pin classification quality and reproducibility on
//! deterministic synthetic datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use canopy_rf::{RandomForestConfig, SplitCriterion};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 300 samples, 10 features, 3 classes, assigned round-robin.
///
/// Features 0-2 carry the class (class * 3.0 + noise in [0, 0.5]);
/// features 3-9 are pure noise in [0, 0.5].
fn make_classification(seed: u64) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels: Vec<usize> = (0..300).map(|i| i % 3).collect();
    let features = labels
        .iter()
        .map(|&class| {
            (0..10)
                .map(|f| {
                    let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                    base + rng.r#gen::<f64>() * 0.5
                })
                .collect()
        })
        .collect();
    let classes = vec!["setosa".into(), "versicolor".into(), "virginica".into()];
    (features, labels, classes)
}

fn accuracy(predictions: &[usize], labels: &[usize]) -> f64 {
    let correct = predictions.iter().zip(labels).filter(|(p, l)| p == l).count();
    correct as f64 / labels.len() as f64
}

// ---------------------------------------------------------------------------
// Held-out accuracy
// ---------------------------------------------------------------------------

/// A forest trained on one draw must generalize to an independent draw.
#[test]
fn held_out_accuracy_above_threshold() {
    let (train_x, train_y, classes) = make_classification(42);
    let (test_x, test_y, _) = make_classification(7);

    let forest = RandomForestConfig::new(100)
        .unwrap()
        .fit(&train_x, &train_y, &classes)
        .unwrap();
    let predictions = forest.predict_batch(&test_x).unwrap();

    let acc = accuracy(&predictions, &test_y);
    assert!(acc > 0.95, "held-out accuracy {acc} <= 0.95");
}

/// The entropy criterion must reach the same quality bar.
#[test]
fn entropy_criterion_accuracy() {
    let (train_x, train_y, classes) = make_classification(42);
    let (test_x, test_y, _) = make_classification(11);

    let forest = RandomForestConfig::new(50)
        .unwrap()
        .with_criterion(SplitCriterion::Entropy)
        .with_seed(5)
        .fit(&train_x, &train_y, &classes)
        .unwrap();

    let acc = accuracy(&forest.predict_batch(&test_x).unwrap(), &test_y);
    assert!(acc > 0.95, "entropy accuracy {acc} <= 0.95");
}

// ---------------------------------------------------------------------------
// Reproducibility
// ---------------------------------------------------------------------------

/// Same seed and data must give bit-identical probabilities, regardless of
/// how rayon schedules the trees.
#[test]
fn deterministic_probabilities() {
    let (features, labels, classes) = make_classification(42);
    let config = RandomForestConfig::new(64).unwrap().with_seed(1234);

    let first = config.fit(&features, &labels, &classes).unwrap();
    let second = config.fit(&features, &labels, &classes).unwrap();

    assert_eq!(
        first.predict_proba_batch(&features).unwrap(),
        second.predict_proba_batch(&features).unwrap()
    );
    assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
}

/// Training accuracy with 100 trees must exceed 0.95.
#[test]
fn prediction_accuracy_on_training_data() {
    let (features, labels, classes) = make_classification(42);
    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(&features, &labels, &classes)
        .unwrap();

    let acc = accuracy(&forest.predict_batch(&features).unwrap(), &labels);
    assert!(acc > 0.95, "training accuracy {acc} <= 0.95");
}
