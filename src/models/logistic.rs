//! L2-regularized logistic regression fit by batch gradient descent

use crate::error::EvaluationError;
use crate::models::{Classifier, ModelSettings};
use tracing::debug;

pub struct LogisticRegression {
    max_iter: usize,
    learning_rate: f64,
    l2: f64,
    tolerance: f64,
    coefficients: Vec<f64>,
    intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            max_iter: settings.max_iter,
            learning_rate: settings.learning_rate,
            l2: settings.l2,
            tolerance: 1e-6,
            coefficients: Vec::new(),
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(v, c)| v * c)
                .sum::<f64>()
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8], weights: &[f64]) -> Result<(), EvaluationError> {
        let n = x.len();
        if n == 0 || y.len() != n || weights.len() != n {
            return Err(EvaluationError::Model(format!(
                "logistic regression fit with {} rows, {} labels, {} weights",
                n,
                y.len(),
                weights.len()
            )));
        }

        let n_features = x[0].len();
        let weight_sum: f64 = weights.iter().sum();
        if weight_sum <= 0.0 {
            return Err(EvaluationError::Model("sample weights sum to zero".to_string()));
        }

        self.coefficients = vec![0.0; n_features];
        self.intercept = 0.0;

        let mut iterations = 0;
        for _ in 0..self.max_iter {
            iterations += 1;
            let mut grad = vec![0.0; n_features];
            let mut grad_intercept = 0.0;

            for ((row, &label), &w) in x.iter().zip(y).zip(weights) {
                let err = w * (sigmoid(self.decision(row)) - f64::from(label));
                for (g, v) in grad.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_intercept += err;
            }

            let mut norm = 0.0;
            for (g, c) in grad.iter_mut().zip(&self.coefficients) {
                *g = *g / weight_sum + self.l2 * c;
                norm += *g * *g;
            }
            grad_intercept /= weight_sum;
            norm += grad_intercept * grad_intercept;

            for (c, g) in self.coefficients.iter_mut().zip(&grad) {
                *c -= self.learning_rate * g;
            }
            self.intercept -= self.learning_rate * grad_intercept;

            if norm.sqrt() < self.tolerance {
                break;
            }
        }

        debug!(rows = n, features = n_features, iterations, "Logistic regression fitted");
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| sigmoid(self.decision(row))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learns_direction() {
        let x: Vec<Vec<f64>> = (-10..10).map(|i| vec![f64::from(i) / 5.0]).collect();
        let y: Vec<u8> = (-10..10).map(|i| u8::from(i >= 0)).collect();

        let mut model = LogisticRegression::new(&ModelSettings::default());
        model.fit(&x, &y, &vec![1.0; 20]).unwrap();

        assert!(model.coefficients()[0] > 0.0);
        let proba = model.predict_proba(&[vec![-1.5], vec![1.5]]);
        assert!(proba[0] < 0.5);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_zero_weights_rejected() {
        let mut model = LogisticRegression::new(&ModelSettings::default());
        assert!(model.fit(&[vec![1.0]], &[1], &[0.0]).is_err());
    }
}
