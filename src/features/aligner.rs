//! Feature alignment.
//!
//! Reshapes an `EncodedRow` into the exact, positional layout the imputer,
//! scaler and estimators were fit on:
//!
//! - output length and order are always the training schema's
//! - schema columns missing from the row get a default (see `DefaultFill`)
//! - row columns not in the schema are dropped
//!
//! Everything downstream indexes features by position, so a misordered vector
//! would silently corrupt predictions. The name-to-position map is built once
//! from the schema and never derived from the incoming row.

use std::collections::{BTreeMap, HashMap};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::domain::MissingColumnPolicy;
use crate::error::{LoadError, PredictError};
use crate::features::encoder::EncodedRow;

/// Default-value table for schema columns the encoded row does not carry.
///
/// Lookup order: an explicit entry in `defaults`, then the `missing` policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultFill {
    #[serde(default)]
    defaults: BTreeMap<String, f64>,
    #[serde(default)]
    missing: MissingColumnPolicy,
}

impl DefaultFill {
    pub fn new(missing: MissingColumnPolicy) -> Self {
        Self {
            defaults: BTreeMap::new(),
            missing,
        }
    }

    pub fn with_default(mut self, column: impl Into<String>, value: f64) -> Self {
        self.defaults.insert(column.into(), value);
        self
    }

    /// Add `value` for `column` unless the table already lists it.
    pub fn insert_if_absent(&mut self, column: &str, value: f64) {
        self.defaults.entry(column.to_string()).or_insert(value);
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.defaults.get(column).copied()
    }

    pub fn missing_policy(&self) -> MissingColumnPolicy {
        self.missing
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Maps an encoded row onto the training schema.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    schema: Vec<String>,
    positions: HashMap<String, usize>,
    fill: DefaultFill,
    snapshot_medians: Option<BTreeMap<String, f64>>,
}

impl FeatureAligner {
    pub fn new(
        schema: Vec<String>,
        fill: DefaultFill,
        snapshot_medians: Option<BTreeMap<String, f64>>,
    ) -> Result<Self, LoadError> {
        if schema.is_empty() {
            return Err(LoadError::Missing("training schema".to_string()));
        }

        let mut positions = HashMap::with_capacity(schema.len());
        for (idx, column) in schema.iter().enumerate() {
            if positions.insert(column.clone(), idx).is_some() {
                return Err(LoadError::Inconsistent(format!(
                    "duplicate schema column '{column}'"
                )));
            }
        }

        for (column, _) in fill.entries() {
            if !positions.contains_key(column) {
                return Err(LoadError::Inconsistent(format!(
                    "default table lists '{column}', which is not a schema column"
                )));
            }
        }

        Ok(Self {
            schema,
            positions,
            fill,
            snapshot_medians,
        })
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn fill(&self) -> &DefaultFill {
        &self.fill
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot_medians.is_some()
    }

    /// Value used for `column` when the encoded row does not carry it.
    ///
    /// `NaN` means "leave missing for the imputer".
    pub fn default_for(&self, column: &str) -> Result<f64, PredictError> {
        if let Some(value) = self.fill.get(column) {
            return Ok(value);
        }
        match self.fill.missing_policy() {
            MissingColumnPolicy::Zero => Ok(0.0),
            MissingColumnPolicy::Impute => Ok(f64::NAN),
            MissingColumnPolicy::SnapshotMedian => self
                .snapshot_medians
                .as_ref()
                .and_then(|m| m.get(column).copied())
                .ok_or_else(|| PredictError::DataUnavailable {
                    column: column.to_string(),
                }),
        }
    }

    /// Fixed-length, schema-ordered feature vector for `row`.
    pub fn align(&self, row: &EncodedRow) -> Result<DVector<f64>, PredictError> {
        let mut out = DVector::zeros(self.schema.len());
        for (idx, column) in self.schema.iter().enumerate() {
            out[idx] = match row.get(column) {
                Some(value) => value,
                None => self.default_for(column)?,
            };
        }
        Ok(out)
    }

    /// Row columns that `align` will ignore.
    pub fn dropped_columns<'a>(&self, row: &'a EncodedRow) -> Vec<&'a str> {
        row.columns()
            .filter(|c| !self.positions.contains_key(*c))
            .collect()
    }
}
