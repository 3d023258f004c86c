//! Isolation forest anomaly model.
//!
//! Anomalies are isolated by fewer random axis-aligned cuts than normal points.
//! Scores follow the usual convention: `score_samples` is the negated anomaly
//! score in `[-1, 0]`, and `decision_function` shifts it by the contamination
//! quantile of the training scores so that negative values mark outliers.

use crate::config::AnomalyParams;
use crate::error::TrainingError;
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Label returned by [`IsolationForest::predict`] for outliers
pub const OUTLIER: i8 = -1;
/// Label returned by [`IsolationForest::predict`] for inliers
pub const INLIER: i8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    fn path_length(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                IsolationNode::Leaf { size } => return depth + average_path_length(*size),
                IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    max_depth: usize,
    rng: ChaCha8Rng,
    nodes: Vec<IsolationNode>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let node_idx = self.nodes.len();
        self.nodes.push(IsolationNode::Leaf {
            size: indices.len(),
        });

        if depth >= self.max_depth || indices.len() <= 1 {
            return node_idx;
        }

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        // first feature that is not constant on this node
        let split = features.into_iter().find_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &i| {
                let v = self.x[[i, feature]];
                (acc.0.min(v), acc.1.max(v))
            });
            (max > min).then_some((feature, min, max))
        });

        let Some((feature, min, max)) = split else {
            return node_idx;
        };
        let threshold = self.rng.gen_range(min..max);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, feature]] < threshold);

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[node_idx] = IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_idx
    }
}

/// Fitted isolation forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    max_samples: usize,
    contamination: f64,
    offset: f64,
}

impl IsolationForest {
    /// Fit on unlabeled, already scaled samples.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        params: &AnomalyParams,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if params.n_estimators == 0 {
            return Err(TrainingError::Shape(
                "isolation forest needs at least one tree".to_string(),
            ));
        }

        let max_samples = params.max_samples.clamp(1, n_samples);
        let max_depth = (max_samples as f64).log2().ceil().max(0.0) as usize;

        let trees: Vec<IsolationTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(tree_idx as u64);
                let sample = rand::seq::index::sample(&mut rng, n_samples, max_samples).into_vec();

                let mut builder = TreeBuilder {
                    x,
                    max_depth,
                    rng,
                    nodes: Vec::new(),
                };
                builder.build(sample, 0);
                IsolationTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        let mut forest = Self {
            trees,
            n_features: x.ncols(),
            max_samples,
            contamination: params.contamination,
            offset: 0.0,
        };

        let rows: Vec<ArrayView1<'_, f64>> = x.outer_iter().collect();
        let mut training_scores: Vec<f64> = rows
            .par_iter()
            .map(|row| forest.score_samples(*row))
            .collect();
        forest.offset = quantile(&mut training_scores, params.contamination);

        Ok(forest)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Negated anomaly score in `[-1, 0]`; lower is more anomalous.
    pub fn score_samples(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| tree.path_length(row))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.max_samples);
        let normalizer = if normalizer > 0.0 { normalizer } else { 1.0 };
        -(2f64.powf(-mean_depth / normalizer))
    }

    /// Score relative to the contamination cutoff; negative means outlier.
    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.score_samples(row) - self.offset
    }

    /// [`OUTLIER`] or [`INLIER`]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> i8 {
        if self.decision_function(row) < 0.0 {
            OUTLIER
        } else {
            INLIER
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]. Sorts `values` in place.
fn quantile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * frac
}
