//! Persisted imputation and standardization.
//!
//! Both transforms apply statistics fitted once at training time. Nothing here
//! is ever re-fit on request data: a single row standardized against itself has
//! zero variance and carries no information.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, PredictError};

/// Column-wise median imputer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    medians: Vec<f64>,
}

impl MedianImputer {
    pub fn new(medians: Vec<f64>) -> Self {
        Self { medians }
    }

    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    pub fn check_len(&self, n_features: usize) -> Result<(), LoadError> {
        if self.medians.len() != n_features {
            return Err(LoadError::Inconsistent(format!(
                "imputer has {} medians for {n_features} schema columns",
                self.medians.len()
            )));
        }
        if let Some(idx) = self.medians.iter().position(|m| !m.is_finite()) {
            return Err(LoadError::Inconsistent(format!(
                "imputer median at position {idx} is not finite"
            )));
        }
        Ok(())
    }

    /// Replace every `NaN` entry with the training-time median of its column.
    pub fn impute(&self, mut x: DVector<f64>) -> Result<DVector<f64>, PredictError> {
        if x.len() != self.medians.len() {
            return Err(PredictError::Inference(format!(
                "imputer expects {} features, got {}",
                self.medians.len(),
                x.len()
            )));
        }
        for (value, median) in x.iter_mut().zip(&self.medians) {
            if value.is_nan() {
                *value = *median;
            }
        }
        Ok(x)
    }
}

/// Standard scaler: `(x - mean) / scale`, per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn check_len(&self, n_features: usize) -> Result<(), LoadError> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(LoadError::Inconsistent(format!(
                "scaler has {} means and {} scales for {n_features} schema columns",
                self.mean.len(),
                self.scale.len()
            )));
        }
        let bad_mean = self.mean.iter().position(|m| !m.is_finite());
        let bad_scale = self.scale.iter().position(|s| !s.is_finite() || *s < 0.0);
        if let Some(idx) = bad_mean.or(bad_scale) {
            return Err(LoadError::Inconsistent(format!(
                "scaler statistics at position {idx} are invalid"
            )));
        }
        Ok(())
    }

    /// Standardize `x` with the persisted statistics.
    ///
    /// A zero scale (constant column at training time) divides by 1.
    pub fn transform(&self, mut x: DVector<f64>) -> Result<DVector<f64>, PredictError> {
        if x.len() != self.mean.len() {
            return Err(PredictError::Inference(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                x.len()
            )));
        }
        for (i, value) in x.iter_mut().enumerate() {
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            *value = (*value - self.mean[i]) / scale;
        }
        Ok(x)
    }
}

/// Median of the finite values in `values` (sorts in place).
pub fn median(values: &mut Vec<f64>) -> Option<f64> {
    values.retain(|v| v.is_finite());
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
