//! Feature standardization

/// Per-feature mean and standard deviation, applied as `(x - mean) / std`
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on the given rows of `x`
    ///
    /// Which rows are passed decides whether test statistics leak into
    /// preprocessing. Constant features get a scale of 1.
    pub fn fit(x: &[Vec<f64>], rows: &[usize]) -> Self {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut mean = vec![0.0; n_features];
        let mut scale = vec![1.0; n_features];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        let n = rows.len() as f64;
        for &r in rows {
            for (m, v) in mean.iter_mut().zip(&x[r]) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for &r in rows {
            for ((acc, v), m) in var.iter_mut().zip(&x[r]).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        for (s, v) in scale.iter_mut().zip(&var) {
            let std = (v / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { mean, scale }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}
