//! Disease classification model
//!
//! The prediction layer only sees the [`DiseaseClassifier`] trait; the
//! gradient-boosted tree ensemble in [`gbdt`] is the implementation trained
//! by this crate.

use rand::Rng;
use rand::seq::SliceRandom;

pub mod gbdt;
pub mod tree;

pub use gbdt::{BoostingParams, GradientBoostedClassifier};
pub use tree::{RegressionTree, TreeParams};

/// A trained multi-class model over encoded feature rows
pub trait DiseaseClassifier: Send + Sync {
    /// Number of features the model expects per row
    fn feature_count(&self) -> usize;

    /// Number of classes the model distinguishes
    fn class_count(&self) -> usize;

    /// Class probabilities for one feature row, in class-index order
    fn predict_proba(&self, features: &[f32]) -> Vec<f64>;
}

/// Numerically stable softmax
#[must_use]
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Shuffle `0..n` and split it into training and test indices
///
/// The test part holds `round(n * test_fraction)` indices.
pub fn train_test_split<R: Rng + ?Sized>(
    n: usize,
    test_fraction: f64,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let test_len = ((n as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let train = indices.split_off(test_len.min(n));
    (train, indices)
}
