//! Flat decision-tree evaluation.
//!
//! Trees are stored as a node list in depth-first order. A split sends
//! `x[feature] <= threshold` to `left`, everything else to `right`. Leaves hold
//! a value vector: one entry for regression trees, one entry per class for
//! classification trees.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Single-leaf tree, handy for tests and degenerate ensembles.
    pub fn constant(value: Vec<f64>) -> Self {
        Self::new(vec![TreeNode::Leaf { value }])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural checks run once at load time.
    ///
    /// Children must point forward (index greater than their parent), which
    /// rules out cycles and guarantees `leaf` terminates.
    pub fn check(&self, n_features: usize, leaf_width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, but there are only {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child index {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {idx} holds {} values, expected {leaf_width}",
                            value.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `x`. Assumes `check` passed.
    pub fn leaf(&self, x: &DVector<f64>) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}
