//! Random forest fraud classifier.
//!
//! Bootstrap-aggregated CART trees grown on Gini impurity with balanced class
//! weights, so the minority fraud class carries as much total weight as the
//! legitimate class. Each split considers a random subset of `sqrt(n_features)`
//! features.

use crate::config::ClassifierParams;
use crate::error::TrainingError;
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum gap between neighbouring values for a threshold to sit between them
const FEATURE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum DecisionNode {
    Leaf {
        fraud_probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<DecisionNode>,
}

impl DecisionTree {
    fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                DecisionNode::Leaf { fraud_probability } => return *fraud_probability,
                DecisionNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    labels: &'a [usize],
    /// bootstrap count times class weight, per training row
    weights: Vec<f64>,
    params: &'a ClassifierParams,
    max_features: usize,
    rng: ChaCha8Rng,
    nodes: Vec<DecisionNode>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let (total, positive) = self.weight_totals(&indices);
        let fraud_probability = if total > 0.0 { positive / total } else { 0.0 };

        let node_idx = self.nodes.len();
        self.nodes.push(DecisionNode::Leaf { fraud_probability });

        let pure = positive <= 0.0 || positive >= total;
        if pure
            || depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split.max(2)
        {
            return node_idx;
        }

        let Some(split) = self.best_split(&indices, total, positive) else {
            return node_idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[node_idx] = DecisionNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn weight_totals(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(total, positive), &i| {
            let w = self.weights[i];
            (total + w, positive + if self.labels[i] == 1 { w } else { 0.0 })
        })
    }

    /// Visit features in random order until `max_features` non-constant ones
    /// have been evaluated, keeping the lowest weighted child impurity.
    fn best_split(
        &mut self,
        indices: &[usize],
        total: f64,
        positive: f64,
    ) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;
        let mut sorted = indices.to_vec();

        for feature in features {
            if visited >= self.max_features {
                break;
            }
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let first = self.x[[sorted[0], feature]];
            let last = self.x[[sorted[sorted.len() - 1], feature]];
            if last - first <= FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let mut left_total = 0.0;
            let mut left_positive = 0.0;
            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                let w = self.weights[i];
                left_total += w;
                if self.labels[i] == 1 {
                    left_positive += w;
                }

                let left_count = pos + 1;
                let right_count = sorted.len() - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                let value = self.x[[i, feature]];
                let next = self.x[[sorted[pos + 1], feature]];
                if next <= value + FEATURE_THRESHOLD {
                    continue;
                }

                let right_total = total - left_total;
                let right_positive = positive - left_positive;
                let impurity = (left_total * gini(left_positive, left_total)
                    + right_total * gini(right_positive, right_total))
                    / total;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = value / 2.0 + next / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(positive: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

/// Fitted random forest over binary labels (1 = fraud)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    n_features: usize,
    class_weights: [f64; 2],
}

impl RandomForestClassifier {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        labels: &[usize],
        params: &ClassifierParams,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if labels.len() != n_samples {
            return Err(TrainingError::Shape(format!(
                "{} feature rows but {} labels",
                n_samples,
                labels.len()
            )));
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(TrainingError::Shape(format!("label {bad} is not binary")));
        }

        let positives = labels.iter().filter(|&&l| l == 1).count();
        let negatives = n_samples - positives;
        if positives == 0 {
            return Err(TrainingError::SingleClass(0));
        }
        if negatives == 0 {
            return Err(TrainingError::SingleClass(1));
        }

        // n_samples / (n_classes * class_count)
        let class_weights = [
            n_samples as f64 / (2.0 * negatives as f64),
            n_samples as f64 / (2.0 * positives as f64),
        ];
        let max_features = ((x.ncols() as f64).sqrt() as usize).max(1);

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(tree_idx as u64);

                let mut counts = vec![0u32; n_samples];
                for _ in 0..n_samples {
                    counts[rng.gen_range(0..n_samples)] += 1;
                }
                let weights: Vec<f64> = counts
                    .iter()
                    .zip(labels)
                    .map(|(&c, &label)| f64::from(c) * class_weights[label])
                    .collect();
                let in_bag: Vec<usize> = (0..n_samples).filter(|&i| counts[i] > 0).collect();

                let mut builder = TreeBuilder {
                    x: x.view(),
                    labels,
                    weights,
                    params,
                    max_features,
                    rng,
                    nodes: Vec::new(),
                };
                builder.build(in_bag, 0);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Ok(Self {
            trees,
            n_features: x.ncols(),
            class_weights,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    /// Mean positive-class leaf fraction over all trees, in [0, 1]
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict_proba(row)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    /// 1 when the fraud probability exceeds 0.5
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> usize {
        usize::from(self.predict_proba(row) > 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn params(n_estimators: usize) -> ClassifierParams {
        ClassifierParams {
            n_estimators,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Label is 1 when the first feature is positive; second feature is noise
    fn separable(n: usize) -> (Array2<f64>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let x = Array2::from_shape_fn((n, 2), |_| rng.gen_range(-1.0..1.0));
        let labels = x.outer_iter().map(|r| usize::from(r[0] > 0.0)).collect();
        (x, labels)
    }

    #[test]
    fn test_learns_separable_boundary() {
        let (x, labels) = separable(400);
        let forest = RandomForestClassifier::fit(x.view(), &labels, &params(20), 42).unwrap();

        assert!(forest.predict_proba(array![0.8, 0.0].view()) > 0.9);
        assert!(forest.predict_proba(array![-0.8, 0.0].view()) < 0.1);
        assert_eq!(forest.predict(array![0.5, -0.5].view()), 1);
        assert_eq!(forest.predict(array![-0.5, 0.5].view()), 0);
    }

    #[test]
    fn test_balanced_weights_favor_minority() {
        let x = array![[0.0], [0.1], [0.2], [0.3], [1.0]];
        let labels = vec![0, 0, 0, 0, 1];
        let forest = RandomForestClassifier::fit(x.view(), &labels, &params(5), 1).unwrap();

        let [w0, w1] = forest.class_weights();
        assert!((w0 - 5.0 / 8.0).abs() < 1e-12);
        assert!((w1 - 5.0 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let x = array![[0.0], [1.0], [2.0]];
        let err = RandomForestClassifier::fit(x.view(), &[0, 0, 0], &params(3), 0).unwrap_err();
        assert_eq!(err, TrainingError::SingleClass(0));

        let err = RandomForestClassifier::fit(x.view(), &[1, 1, 1], &params(3), 0).unwrap_err();
        assert_eq!(err, TrainingError::SingleClass(1));
    }

    #[test]
    fn test_label_count_mismatch_is_rejected() {
        let x = array![[0.0], [1.0]];
        let err = RandomForestClassifier::fit(x.view(), &[0], &params(3), 0).unwrap_err();
        assert!(matches!(err, TrainingError::Shape(_)));
    }

    #[test]
    fn test_probabilities_bounded_for_extreme_inputs() {
        let (x, labels) = separable(200);
        let forest = RandomForestClassifier::fit(x.view(), &labels, &params(10), 8).unwrap();
        for row in [array![1e12, -1e12], array![-1e300, 1e300], array![0.0, 0.0]] {
            let p = forest.predict_proba(row.view());
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, labels) = separable(150);
        let a = RandomForestClassifier::fit(x.view(), &labels, &params(8), 5).unwrap();
        let b = RandomForestClassifier::fit(x.view(), &labels, &params(8), 5).unwrap();
        assert_eq!(a, b);
    }
}
