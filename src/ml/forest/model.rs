//! Serialized form and inference for the bagged-tree classifier.

use serde::{Deserialize, Serialize};

/// One node of a fitted decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal split: `feature <= threshold` goes left.
    Split {
        feature: u32,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Terminal node holding a class probability distribution.
    Leaf { distribution: Vec<f32> },
}

/// A single fitted tree; the root lives at node index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree for a feature row and return the leaf distribution.
    ///
    /// Returns `None` on malformed node references; [`ForestModel::validate`]
    /// rules that out for persisted models.
    pub fn leaf_distribution(&self, features: &[f32]) -> Option<&[f32]> {
        let mut index = 0usize;
        // Bounded walk so a cyclic node graph cannot spin forever.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(index)? {
                TreeNode::Leaf { distribution } => return Some(distribution),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature as usize).copied().unwrap_or(0.0);
                    index = if value <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
        None
    }
}

/// Bagged-tree ensemble over TF-IDF feature rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Ordered class identifiers; leaf distributions align with this.
    pub classes: Vec<String>,
    /// Expected feature row length.
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Validate structural invariants of a (possibly deserialized) model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model contains no trees".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("Tree {tree_idx} is empty"));
            }
            for node in &tree.nodes {
                match node {
                    TreeNode::Leaf { distribution } => {
                        if distribution.len() != self.classes.len() {
                            return Err(format!(
                                "Tree {tree_idx} has a leaf with {} classes but expected {}",
                                distribution.len(),
                                self.classes.len()
                            ));
                        }
                    }
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature as usize >= self.n_features {
                            return Err(format!(
                                "Tree {tree_idx} splits on feature {feature} outside 0..{}",
                                self.n_features
                            ));
                        }
                        if *left as usize >= tree.nodes.len()
                            || *right as usize >= tree.nodes.len()
                        {
                            return Err(format!("Tree {tree_idx} has an out-of-range child"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Average the leaf distributions of every tree.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let k = self.classes.len();
        let mut sums = vec![0.0f32; k];
        let mut voters = 0usize;
        for tree in &self.trees {
            let Some(distribution) = tree.leaf_distribution(features) else {
                continue;
            };
            for (sum, p) in sums.iter_mut().zip(distribution) {
                *sum += p;
            }
            voters += 1;
        }
        if voters == 0 {
            return vec![1.0 / k as f32; k];
        }
        for sum in &mut sums {
            *sum /= voters as f32;
        }
        sums
    }

    /// Top class index and its probability.
    pub fn predict(&self, features: &[f32]) -> (usize, f32) {
        let probabilities = self.predict_proba(features);
        let mut best_idx = 0usize;
        let mut best_p = f32::NEG_INFINITY;
        for (idx, &p) in probabilities.iter().enumerate() {
            if p > best_p {
                best_p = p;
                best_idx = idx;
            }
        }
        (best_idx, best_p.max(0.0))
    }
}
