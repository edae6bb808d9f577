//! Multi-class gradient boosting with a softmax objective
//!
//! Each boosting round fits one regression tree per class to the gradient
//! `p - y` and hessian `p(1 - p)` of the softmax cross-entropy. The trees of
//! a round are independent of each other and are built in parallel.

use std::time::Instant;

use rayon::prelude::*;

use crate::error::{Result, SynthError};
use crate::features::FeatureMatrix;
use crate::model::tree::{BinnedMatrix, RegressionTree, TreeParams};
use crate::model::{DiseaseClassifier, softmax};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Floor for hessians so leaves stay finite on saturated probabilities
const MIN_HESSIAN: f64 = 1e-6;

/// Boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_bins: usize,
    pub tree: TreeParams,
    pub show_progress: bool,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            rounds: 30,
            learning_rate: 0.3,
            max_bins: 32,
            tree: TreeParams::default(),
            show_progress: false,
        }
    }
}

/// Softmax ensemble of regression trees
#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    feature_count: usize,
    base_scores: Vec<f64>,
    /// `rounds[r][k]` is the tree of class `k` in round `r`
    rounds: Vec<Vec<RegressionTree>>,
}

impl GradientBoostedClassifier {
    /// Train on `features` with class indices `labels` in `0..class_count`
    pub fn fit(
        features: &FeatureMatrix,
        labels: &[usize],
        class_count: usize,
        params: &BoostingParams,
    ) -> Result<Self> {
        let n = features.rows();
        if n == 0 {
            return Err(SynthError::Training("no training rows".to_string()));
        }
        if labels.len() != n {
            return Err(SynthError::Training(format!(
                "{} labels for {n} feature rows",
                labels.len()
            )));
        }
        if class_count == 0 {
            return Err(SynthError::Training("no classes to learn".to_string()));
        }
        if let Some(label) = labels.iter().find(|&&label| label >= class_count) {
            return Err(SynthError::Training(format!(
                "label {label} outside of {class_count} classes"
            )));
        }

        let start = Instant::now();
        log::info!(
            "Training {class_count}-class boosting model on {n} rows x {} features, {} rounds",
            features.columns(),
            params.rounds
        );

        let data = BinnedMatrix::from_matrix(features, params.max_bins);
        let base_scores = class_priors(labels, class_count);
        let mut scores: Vec<f64> = base_scores
            .iter()
            .copied()
            .cycle()
            .take(n * class_count)
            .collect();
        let mut rounds = Vec::with_capacity(params.rounds);

        let pb = params
            .show_progress
            .then(|| create_main_progress_bar(params.rounds as u64, Some("Boosting rounds")));

        for round in 0..params.rounds {
            let probabilities: Vec<f64> = scores
                .par_chunks(class_count)
                .flat_map_iter(softmax)
                .collect();

            let trees: Vec<RegressionTree> = (0..class_count)
                .into_par_iter()
                .map(|class| {
                    let (gradients, hessians): (Vec<f64>, Vec<f64>) = (0..n)
                        .map(|row| {
                            let p = probabilities[row * class_count + class];
                            let y = if labels[row] == class { 1.0 } else { 0.0 };
                            (p - y, (p * (1.0 - p)).max(MIN_HESSIAN))
                        })
                        .unzip();
                    let mut tree =
                        RegressionTree::fit(&data, &gradients, &hessians, (0..n).collect(), &params.tree);
                    tree.scale(params.learning_rate);
                    tree
                })
                .collect();

            scores
                .par_chunks_mut(class_count)
                .enumerate()
                .for_each(|(row, row_scores)| {
                    for (score, tree) in row_scores.iter_mut().zip(&trees) {
                        *score += tree.predict_binned(&data, row);
                    }
                });
            rounds.push(trees);

            if let Some(pb) = &pb {
                pb.inc(1);
            }
            if round % 10 == 9 || round + 1 == params.rounds {
                log::debug!(
                    "Round {}: training log loss {:.4}",
                    round + 1,
                    log_loss(&scores, labels, class_count)
                );
            }
        }

        if let Some(pb) = &pb {
            finish_progress_bar(pb, Some("Boosting complete"));
        }
        log::info!("Training finished in {:?}", start.elapsed());

        Ok(Self {
            feature_count: features.columns(),
            base_scores,
            rounds,
        })
    }

    #[must_use]
    pub fn rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Raw class scores before the softmax
    #[must_use]
    pub fn decision_function(&self, row: &[f32]) -> Vec<f64> {
        let mut scores = self.base_scores.clone();
        for trees in &self.rounds {
            for (score, tree) in scores.iter_mut().zip(trees) {
                *score += tree.predict(row);
            }
        }
        scores
    }

    /// Most probable class of every row
    #[must_use]
    pub fn predict_classes(&self, features: &FeatureMatrix) -> Vec<usize> {
        (0..features.rows())
            .into_par_iter()
            .map(|row| argmax(&self.decision_function(features.row(row))))
            .collect()
    }

    /// Share of rows whose most probable class equals the label
    #[must_use]
    pub fn accuracy(&self, features: &FeatureMatrix, labels: &[usize]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let correct = self
            .predict_classes(features)
            .iter()
            .zip(labels)
            .filter(|(predicted, label)| predicted == label)
            .count();
        correct as f64 / labels.len() as f64
    }
}

impl DiseaseClassifier for GradientBoostedClassifier {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn class_count(&self) -> usize {
        self.base_scores.len()
    }

    fn predict_proba(&self, features: &[f32]) -> Vec<f64> {
        softmax(&self.decision_function(features))
    }
}

/// Log of the smoothed class frequencies
fn class_priors(labels: &[usize], class_count: usize) -> Vec<f64> {
    let mut counts = vec![0usize; class_count];
    for &label in labels {
        counts[label] += 1;
    }
    let total = (labels.len() + class_count) as f64;
    counts
        .into_iter()
        .map(|count| ((count + 1) as f64 / total).ln())
        .collect()
}

fn log_loss(scores: &[f64], labels: &[usize], class_count: usize) -> f64 {
    let total: f64 = scores
        .chunks(class_count)
        .zip(labels)
        .map(|(row, &label)| -softmax(row)[label].max(1e-15).ln())
        .sum();
    total / labels.len() as f64
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i)
}
