//! Bagged ensemble of decision trees

use crate::error::EvaluationError;
use crate::models::tree::{DecisionTree, TreeParams};
use crate::models::{Classifier, ModelSettings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

/// Random forest with bootstrap sampling and sqrt(features) per split
pub struct RandomForest {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            n_estimators: settings.n_estimators.max(1),
            max_depth: settings.max_depth,
            min_samples_split: settings.min_samples_split.max(2),
            seed: settings.seed,
            trees: Vec::new(),
        }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8], weights: &[f64]) -> Result<(), EvaluationError> {
        let n = x.len();
        if n == 0 || y.len() != n || weights.len() != n {
            return Err(EvaluationError::Model(format!(
                "random forest fit with {} rows, {} labels, {} weights",
                n,
                y.len(),
                weights.len()
            )));
        }

        let n_features = x[0].len();
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: Some(((n_features as f64).sqrt().round() as usize).max(1)),
        };

        // one rng per tree so the result does not depend on thread scheduling
        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree = DecisionTree::new(params);
                tree.fit(x, y, weights, bootstrap, &mut rng);
                tree
            })
            .collect();

        debug!(
            trees = self.trees.len(),
            rows = n,
            features = n_features,
            "Random forest fitted"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![0.0; x.len()];
        }
        let n_trees = self.trees.len() as f64;
        x.par_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_one(row)).sum::<f64>() / n_trees)
            .collect()
    }
}
