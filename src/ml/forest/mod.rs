//! Bagged decision-tree ensemble for urgency classification.

pub mod model;
pub mod train;

pub use model::{DecisionTree, ForestModel, TreeNode};
pub use train::{ForestOptions, TrainDataset, train_forest};
