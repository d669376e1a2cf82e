//! Persisted estimators.
//!
//! Every estimator exposes the two primitive operations the inference stage
//! relies on:
//! - `predict(x)`: regression value, or class label (`0.0` / `1.0`) for classifiers
//! - `predict_proba(x)`: positive-class probability (classifiers only)
//!
//! `x` is always the aligned, imputed and scaled feature vector.

use std::fmt;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::PredictError;
use crate::models::tree::DecisionTree;

/// Inference interface shared by persisted models and test doubles.
pub trait Estimator: Send + Sync + fmt::Debug {
    fn predict(&self, x: &DVector<f64>) -> Result<f64, PredictError>;

    fn predict_proba(&self, _x: &DVector<f64>) -> Result<f64, PredictError> {
        Err(PredictError::Inference(
            "estimator does not produce class probabilities".to_string(),
        ))
    }
}

/// Serialized estimator, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    LinearRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Positive class when the decision value is strictly positive.
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// `init + learning_rate * Σ tree(x)`.
    GradientBoostingRegressor {
        init: f64,
        learning_rate: f64,
        trees: Vec<DecisionTree>,
    },
    /// Mean of per-tree class distributions; leaves hold `[negative, positive]`
    /// counts or fractions.
    RandomForestClassifier { trees: Vec<DecisionTree> },
}

impl EstimatorSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            EstimatorSpec::LinearRegression { .. } => "linear_regression",
            EstimatorSpec::LogisticRegression { .. } => "logistic_regression",
            EstimatorSpec::GradientBoostingRegressor { .. } => "gradient_boosting_regressor",
            EstimatorSpec::RandomForestClassifier { .. } => "random_forest_classifier",
        }
    }

    pub fn is_classifier(&self) -> bool {
        matches!(
            self,
            EstimatorSpec::LogisticRegression { .. } | EstimatorSpec::RandomForestClassifier { .. }
        )
    }

    /// One-line description for `inspect`.
    pub fn summary(&self) -> String {
        match self {
            EstimatorSpec::LinearRegression { coefficients, .. }
            | EstimatorSpec::LogisticRegression { coefficients, .. } => {
                format!("{} ({} coefficients)", self.kind(), coefficients.len())
            }
            EstimatorSpec::GradientBoostingRegressor {
                learning_rate, trees, ..
            } => format!("{} ({} trees, lr={learning_rate})", self.kind(), trees.len()),
            EstimatorSpec::RandomForestClassifier { trees } => {
                format!("{} ({} trees)", self.kind(), trees.len())
            }
        }
    }

    /// Structural checks against the schema width, run once at load time.
    pub fn check(&self, n_features: usize) -> Result<(), String> {
        match self {
            EstimatorSpec::LinearRegression {
                coefficients,
                intercept,
            }
            | EstimatorSpec::LogisticRegression {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != n_features {
                    return Err(format!(
                        "{} has {} coefficients for {n_features} features",
                        self.kind(),
                        coefficients.len()
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(format!("{} has non-finite parameters", self.kind()));
                }
                Ok(())
            }
            EstimatorSpec::GradientBoostingRegressor {
                init,
                learning_rate,
                trees,
            } => {
                if !init.is_finite() || !learning_rate.is_finite() || *learning_rate <= 0.0 {
                    return Err(format!("{} has invalid init/learning_rate", self.kind()));
                }
                check_trees(trees, n_features, 1)
            }
            EstimatorSpec::RandomForestClassifier { trees } => check_trees(trees, n_features, 2),
        }
    }
}

fn check_trees(trees: &[DecisionTree], n_features: usize, leaf_width: usize) -> Result<(), String> {
    if trees.is_empty() {
        return Err("ensemble has no trees".to_string());
    }
    for (i, tree) in trees.iter().enumerate() {
        tree.check(n_features, leaf_width)
            .map_err(|e| format!("tree {i}: {e}"))?;
    }
    Ok(())
}

fn decision_value(coefficients: &[f64], intercept: f64, x: &DVector<f64>) -> Result<f64, PredictError> {
    if coefficients.len() != x.len() {
        return Err(PredictError::Inference(format!(
            "model expects {} features, got {}",
            coefficients.len(),
            x.len()
        )));
    }
    Ok(x.iter().zip(coefficients).map(|(a, b)| a * b).sum::<f64>() + intercept)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Positive-class share of a `[negative, positive]` leaf.
fn positive_share(leaf: &[f64]) -> f64 {
    let total = leaf[0] + leaf[1];
    if total > 0.0 { leaf[1] / total } else { 0.5 }
}

fn forest_proba(trees: &[DecisionTree], x: &DVector<f64>) -> f64 {
    let sum: f64 = trees.iter().map(|t| positive_share(t.leaf(x))).sum();
    sum / trees.len() as f64
}

impl Estimator for EstimatorSpec {
    fn predict(&self, x: &DVector<f64>) -> Result<f64, PredictError> {
        match self {
            EstimatorSpec::LinearRegression {
                coefficients,
                intercept,
            } => decision_value(coefficients, *intercept, x),
            EstimatorSpec::LogisticRegression {
                coefficients,
                intercept,
            } => {
                let z = decision_value(coefficients, *intercept, x)?;
                Ok(if z > 0.0 { 1.0 } else { 0.0 })
            }
            EstimatorSpec::GradientBoostingRegressor {
                init,
                learning_rate,
                trees,
            } => {
                let sum: f64 = trees.iter().map(|t| t.leaf(x)[0]).sum();
                Ok(init + learning_rate * sum)
            }
            EstimatorSpec::RandomForestClassifier { trees } => {
                // argmax over two classes; ties go to the negative class.
                Ok(if forest_proba(trees, x) > 0.5 { 1.0 } else { 0.0 })
            }
        }
    }

    fn predict_proba(&self, x: &DVector<f64>) -> Result<f64, PredictError> {
        match self {
            EstimatorSpec::LogisticRegression {
                coefficients,
                intercept,
            } => Ok(sigmoid(decision_value(coefficients, *intercept, x)?)),
            EstimatorSpec::RandomForestClassifier { trees } => Ok(forest_proba(trees, x)),
            _ => Err(PredictError::Inference(format!(
                "{} does not produce class probabilities",
                self.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tree::TreeNode;

    fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> DecisionTree {
        DecisionTree::new(vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: left },
            TreeNode::Leaf { value: right },
        ])
    }

    #[test]
    fn linear_regression_is_dot_plus_intercept() {
        let model = EstimatorSpec::LinearRegression {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
        };
        let y = model.predict(&DVector::from_vec(vec![3.0, 4.0])).unwrap();
        assert!((y - 2.5).abs() < 1e-12);
        assert!(model.predict_proba(&DVector::from_vec(vec![3.0, 4.0])).is_err());
    }

    #[test]
    fn logistic_label_agrees_with_probability() {
        let model = EstimatorSpec::LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        let x = DVector::from_vec(vec![0.0]);
        assert_eq!(model.predict_proba(&x).unwrap(), 0.5);
        assert_eq!(model.predict(&x).unwrap(), 0.0);

        let x = DVector::from_vec(vec![2.0]);
        assert!(model.predict_proba(&x).unwrap() > 0.5);
        assert_eq!(model.predict(&x).unwrap(), 1.0);
    }

    #[test]
    fn boosting_sums_scaled_tree_outputs() {
        let model = EstimatorSpec::GradientBoostingRegressor {
            init: 650.0,
            learning_rate: 0.1,
            trees: vec![
                stump(0, 0.0, vec![-50.0], vec![50.0]),
                stump(0, 1.0, vec![-10.0], vec![10.0]),
            ],
        };
        assert!(model.check(1).is_ok());
        let y = model.predict(&DVector::from_vec(vec![0.5])).unwrap();
        assert!((y - (650.0 + 0.1 * (50.0 - 10.0))).abs() < 1e-9);
    }

    #[test]
    fn forest_averages_normalized_leaf_distributions() {
        let model = EstimatorSpec::RandomForestClassifier {
            trees: vec![
                stump(0, 0.0, vec![8.0, 2.0], vec![1.0, 3.0]),
                stump(0, 0.0, vec![0.5, 0.5], vec![0.0, 1.0]),
            ],
        };
        let x = DVector::from_vec(vec![1.0]);
        assert!((model.predict_proba(&x).unwrap() - 0.875).abs() < 1e-12);
        assert_eq!(model.predict(&x).unwrap(), 1.0);

        // (0.2 + 0.5) / 2 = 0.35
        let x = DVector::from_vec(vec![-1.0]);
        assert!((model.predict_proba(&x).unwrap() - 0.35).abs() < 1e-12);
        assert_eq!(model.predict(&x).unwrap(), 0.0);
    }

    #[test]
    fn check_validates_widths() {
        let linear = EstimatorSpec::LinearRegression {
            coefficients: vec![1.0; 3],
            intercept: 0.0,
        };
        assert!(linear.check(3).is_ok());
        assert!(linear.check(4).is_err());

        let forest = EstimatorSpec::RandomForestClassifier {
            trees: vec![DecisionTree::constant(vec![1.0])],
        };
        assert!(forest.check(1).is_err());
        assert!(EstimatorSpec::RandomForestClassifier { trees: vec![] }.check(1).is_err());
    }
}
