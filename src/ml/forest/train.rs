//! Bagging trainer for the decision-tree ensemble.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::model::{DecisionTree, ForestModel, TreeNode};

/// Training hyperparameters for the forest.
#[derive(Debug, Clone)]
pub struct ForestOptions {
    /// Number of bootstrap-sampled trees.
    pub n_trees: usize,
    /// Depth bound; small corpora overfit past this quickly.
    pub max_depth: usize,
    /// Smallest node eligible for splitting.
    pub min_samples_split: usize,
    /// Smallest sample count allowed on either side of a split.
    pub min_samples_leaf: usize,
    /// Seed for bootstrap and feature subsampling.
    pub seed: u64,
    /// Reweight samples inversely to class frequency.
    pub balance_classes: bool,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 20,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
            balance_classes: true,
        }
    }
}

/// In-memory dataset used for training.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Ordered class identifiers.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Train a bagged-tree ensemble with Gini splits and sqrt-feature sampling.
pub fn train_forest(dataset: &TrainDataset, options: &ForestOptions) -> Result<ForestModel, String> {
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    if options.n_trees == 0 {
        return Err("Need at least 1 tree".to_string());
    }
    let n_features = dataset.x[0].len();
    if n_features == 0 {
        return Err("Feature rows are empty".to_string());
    }
    for row in &dataset.x {
        if row.len() != n_features {
            return Err("Inconsistent feature row length".to_string());
        }
    }
    for &label in &dataset.y {
        if label >= n_classes {
            return Err(format!("Label {label} outside 0..{n_classes}"));
        }
    }

    let sample_weights = sample_weights(&dataset.y, n_classes, options.balance_classes);
    let n = dataset.x.len();
    let features_per_split = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_trees);
    for _ in 0..options.n_trees {
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let mut builder = TreeBuilder {
            x: &dataset.x,
            y: &dataset.y,
            weights: &sample_weights,
            n_classes,
            n_features,
            features_per_split,
            options,
            rng: &mut rng,
        };
        let mut nodes = Vec::new();
        builder.build(&mut nodes, &bootstrap, 0);
        trees.push(DecisionTree { nodes });
    }

    Ok(ForestModel {
        model_version: 1,
        classes: dataset.classes.clone(),
        n_features,
        trees,
    })
}

/// Per-sample weights; `balanced` mirrors `n / (k * count_class)`.
fn sample_weights(y: &[usize], n_classes: usize, balance: bool) -> Vec<f32> {
    if !balance {
        return vec![1.0; y.len()];
    }
    let mut counts = vec![0usize; n_classes];
    for &label in y {
        counts[label] += 1;
    }
    let n = y.len() as f32;
    let class_weight: Vec<f32> = counts
        .iter()
        .map(|&count| {
            if count == 0 {
                0.0
            } else {
                n / (n_classes as f32 * count as f32)
            }
        })
        .collect();
    y.iter().map(|&label| class_weight[label]).collect()
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    weights: &'a [f32],
    n_classes: usize,
    n_features: usize,
    features_per_split: usize,
    options: &'a ForestOptions,
    rng: &'a mut StdRng,
}

impl TreeBuilder<'_> {
    /// Grow a subtree for `indices` and return its node index.
    fn build(&mut self, nodes: &mut Vec<TreeNode>, indices: &[usize], depth: usize) -> u32 {
        let distribution = self.weighted_distribution(indices);
        let stop = depth >= self.options.max_depth
            || indices.len() < self.options.min_samples_split
            || is_pure(&distribution);
        if !stop {
            if let Some(split) = self.best_split(indices) {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| self.x[i][split.feature] <= split.threshold);
                let node_index = nodes.len() as u32;
                nodes.push(TreeNode::Leaf {
                    distribution: Vec::new(),
                });
                let left = self.build(nodes, &left_idx, depth + 1);
                let right = self.build(nodes, &right_idx, depth + 1);
                nodes[node_index as usize] = TreeNode::Split {
                    feature: split.feature as u32,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return node_index;
            }
        }
        let node_index = nodes.len() as u32;
        nodes.push(TreeNode::Leaf { distribution });
        node_index
    }

    fn weighted_distribution(&self, indices: &[usize]) -> Vec<f32> {
        let mut sums = vec![0.0f32; self.n_classes];
        let mut total = 0.0f32;
        for &i in indices {
            sums[self.y[i]] += self.weights[i];
            total += self.weights[i];
        }
        if total <= 0.0 {
            return vec![1.0 / self.n_classes as f32; self.n_classes];
        }
        for sum in &mut sums {
            *sum /= total;
        }
        sums
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<CandidateSplit> {
        let mut best: Option<CandidateSplit> = None;
        let candidates =
            rand::seq::index::sample(self.rng, self.n_features, self.features_per_split);
        for feature in candidates {
            let Some(split) = self.best_split_for_feature(indices, feature) else {
                continue;
            };
            if best
                .as_ref()
                .map(|current| split.score < current.score)
                .unwrap_or(true)
            {
                best = Some(split);
            }
        }
        best
    }

    /// Scan sorted values of one feature for the weighted-Gini-optimal cut.
    fn best_split_for_feature(&self, indices: &[usize], feature: usize) -> Option<CandidateSplit> {
        let mut rows: Vec<(f32, usize, f32)> = indices
            .iter()
            .map(|&i| (self.x[i][feature], self.y[i], self.weights[i]))
            .collect();
        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total = class_weight_sums(&rows, self.n_classes);
        let total_weight: f32 = total.iter().sum();
        if total_weight <= 0.0 {
            return None;
        }

        let min_leaf = self.options.min_samples_leaf;
        let mut left = vec![0.0f32; self.n_classes];
        let mut left_weight = 0.0f32;
        let mut best: Option<CandidateSplit> = None;
        for i in 0..rows.len() - 1 {
            let (value, class, weight) = rows[i];
            left[class] += weight;
            left_weight += weight;
            let next_value = rows[i + 1].0;
            if next_value <= value {
                continue;
            }
            let left_count = i + 1;
            let right_count = rows.len() - left_count;
            if left_count < min_leaf || right_count < min_leaf {
                continue;
            }
            let right_weight = total_weight - left_weight;
            if right_weight <= 0.0 {
                break;
            }
            let right: Vec<f32> = total
                .iter()
                .zip(&left)
                .map(|(t, l)| t - l)
                .collect();
            let score = (left_weight * gini(&left, left_weight)
                + right_weight * gini(&right, right_weight))
                / total_weight;
            if best
                .as_ref()
                .map(|current| score < current.score)
                .unwrap_or(true)
            {
                best = Some(CandidateSplit {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    score,
                });
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
struct CandidateSplit {
    feature: usize,
    threshold: f32,
    score: f32,
}

fn class_weight_sums(rows: &[(f32, usize, f32)], n_classes: usize) -> Vec<f32> {
    let mut sums = vec![0.0f32; n_classes];
    for &(_, class, weight) in rows {
        sums[class] += weight;
    }
    sums
}

fn gini(class_weights: &[f32], total: f32) -> f32 {
    if total <= 0.0 {
        return 0.0;
    }
    let mut impurity = 1.0f32;
    for &weight in class_weights {
        let p = weight / total;
        impurity -= p * p;
    }
    impurity
}

fn is_pure(distribution: &[f32]) -> bool {
    distribution.iter().any(|&p| p >= 1.0 - 1e-6)
}
