//! Weighted CART decision tree (Gini impurity)

use rand::rngs::StdRng;
use rand::seq::index;
use std::cmp::Ordering;

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features considered per split; `None` means all
    pub max_features: Option<usize>,
}

/// Binary classification tree over row-major samples
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    params: TreeParams,
}

/// Weighted class totals of a node
#[derive(Debug, Clone, Copy, Default)]
struct ClassWeights {
    pos: f64,
    neg: f64,
}

impl ClassWeights {
    fn add(&mut self, label: u8, weight: f64) {
        if label == 1 {
            self.pos += weight;
        } else {
            self.neg += weight;
        }
    }

    fn total(&self) -> f64 {
        self.pos + self.neg
    }

    fn gini(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let p = self.pos / total;
        2.0 * p * (1.0 - p)
    }

    fn proba(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            0.0
        } else {
            self.pos / total
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    pub fn new(params: TreeParams) -> Self {
        Self {
            nodes: Vec::new(),
            params,
        }
    }

    /// Grow the tree on `samples` (indices into `x`, repeats allowed)
    pub fn fit(
        &mut self,
        x: &[Vec<f64>],
        y: &[u8],
        weights: &[f64],
        samples: Vec<usize>,
        rng: &mut StdRng,
    ) {
        self.nodes.clear();
        self.grow(x, y, weights, samples, 0, rng);
    }

    /// Probability of the positive class for one row
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { proba }) => return *proba,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[u8],
        weights: &[f64],
        samples: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let mut totals = ClassWeights::default();
        for &i in &samples {
            totals.add(y[i], weights[i]);
        }

        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            proba: totals.proba(),
        });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || samples.len() < self.params.min_samples_split || totals.gini() <= 0.0 {
            return node_idx;
        }

        let Some(best) = self.best_split(x, y, weights, &samples, totals, rng) else {
            return node_idx;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[i][best.feature] <= best.threshold);

        let left = self.grow(x, y, weights, left_samples, depth + 1, rng);
        let right = self.grow(x, y, weights, right_samples, depth + 1, rng);
        self.nodes[node_idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx
    }

    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[u8],
        weights: &[f64],
        samples: &[usize],
        totals: ClassWeights,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let k = self
            .params
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));
        let features = index::sample(rng, n_features, k.min(n_features));

        let parent_impurity = totals.gini();
        let total_weight = totals.total();
        let mut best: Option<BestSplit> = None;
        let mut order = samples.to_vec();

        for feature in features.iter() {
            order.sort_by(|&a, &b| {
                x[a][feature]
                    .partial_cmp(&x[b][feature])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left = ClassWeights::default();
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                left.add(y[i], weights[i]);

                let current = x[i][feature];
                let next = x[order[pos + 1]][feature];
                if next <= current {
                    continue;
                }

                let right = ClassWeights {
                    pos: totals.pos - left.pos,
                    neg: totals.neg - left.neg,
                };
                let child_impurity = (left.total() * left.gini() + right.total() * right.gini())
                    / total_weight;
                let gain = parent_impurity - child_impurity;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (current + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(max_depth: Option<usize>) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            max_features: None,
        }
    }

    #[test]
    fn test_learns_threshold() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 12)).collect();
        let w = vec![1.0; 20];

        let mut tree = DecisionTree::new(params(None));
        tree.fit(&x, &y, &w, (0..20).collect(), &mut StdRng::seed_from_u64(0));

        assert_eq!(tree.predict_one(&[3.0]), 0.0);
        assert_eq!(tree.predict_one(&[15.0]), 1.0);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_depth_zero_is_a_leaf() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 1, 0, 1];
        let w = vec![1.0; 4];

        let mut tree = DecisionTree::new(params(Some(0)));
        tree.fit(&x, &y, &w, (0..4).collect(), &mut StdRng::seed_from_u64(0));

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_one(&[0.0]), 0.5);
    }

    #[test]
    fn test_sample_weights_shift_leaf_probability() {
        let x = vec![vec![0.0], vec![0.0], vec![0.0]];
        let y = vec![1, 0, 0];
        let w = vec![2.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(params(None));
        tree.fit(&x, &y, &w, (0..3).collect(), &mut StdRng::seed_from_u64(0));

        // constant feature, no split possible
        assert_eq!(tree.predict_one(&[0.0]), 0.5);
    }
}
