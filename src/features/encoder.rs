//! Categorical feature encoding.
//!
//! Two strategies exist, selected by the artifact:
//!
//! - **dummy**: one `{column}_{category}` indicator per category except the
//!   reference category; only the indicator for the applicant's value is emitted,
//!   every other indicator is back-filled by the aligner's default table
//! - **label**: the value is replaced by its integer code from a persisted
//!   `CategoricalCodec`; unseen values fail fast with a codec error
//!
//! Numeric fields pass through untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ApplicantRecord, UnseenCategoryPolicy};
use crate::error::PredictError;

/// Persisted label encoder for one categorical column.
///
/// The code of a category is its index in `classes` (fitted encoders sort their
/// classes, so this matches training-time codes exactly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalCodec {
    classes: Vec<String>,
}

impl CategoricalCodec {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code for `value`, or a codec error naming `column`.
    pub fn encode(&self, column: &str, value: &str) -> Result<f64, PredictError> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(|idx| idx as f64)
            .ok_or_else(|| PredictError::Codec {
                column: column.to_string(),
                value: value.to_string(),
            })
    }
}

/// Indicator layout for one categorically dummy-encoded column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyColumn {
    categories: Vec<String>,
    reference: String,
}

impl DummyColumn {
    pub fn new(categories: Vec<String>, reference: impl Into<String>) -> Self {
        Self {
            categories,
            reference: reference.into(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn is_known(&self, value: &str) -> bool {
        value == self.reference || self.categories.iter().any(|c| c == value)
    }

    /// Indicator column names, reference excluded, in category order.
    pub fn indicator_columns(&self, column: &str) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| **c != self.reference)
            .map(|c| indicator_name(column, c))
            .collect()
    }
}

/// Training-time name of the indicator column for `column == category`.
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{column}_{category}")
}

/// Single-row feature table: column name to numeric value.
///
/// Order here is by name, not schema order; positional layout is the aligner's job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedRow {
    values: BTreeMap<String, f64>,
}

impl EncodedRow {
    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Training-time categorical encoding carried by the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoder {
    Dummy {
        columns: BTreeMap<String, DummyColumn>,
        #[serde(default)]
        unseen: UnseenCategoryPolicy,
    },
    Label {
        codecs: BTreeMap<String, CategoricalCodec>,
    },
}

impl FeatureEncoder {
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureEncoder::Dummy { .. } => "dummy",
            FeatureEncoder::Label { .. } => "label",
        }
    }

    /// Override the unseen-category policy (dummy encoding only).
    pub fn with_unseen_policy(self, policy: UnseenCategoryPolicy) -> Self {
        match self {
            FeatureEncoder::Dummy { columns, .. } => FeatureEncoder::Dummy {
                columns,
                unseen: policy,
            },
            label @ FeatureEncoder::Label { .. } => label,
        }
    }

    pub fn unseen_policy(&self) -> Option<UnseenCategoryPolicy> {
        match self {
            FeatureEncoder::Dummy { unseen, .. } => Some(*unseen),
            FeatureEncoder::Label { .. } => None,
        }
    }

    /// Categorical source columns this encoder knows about.
    pub fn source_columns(&self) -> Vec<&str> {
        match self {
            FeatureEncoder::Dummy { columns, .. } => columns.keys().map(String::as_str).collect(),
            FeatureEncoder::Label { codecs } => codecs.keys().map(String::as_str).collect(),
        }
    }

    /// Every feature column this encoder can emit for categorical input.
    pub fn produced_columns(&self) -> Vec<String> {
        match self {
            FeatureEncoder::Dummy { columns, .. } => columns
                .iter()
                .flat_map(|(name, col)| col.indicator_columns(name))
                .collect(),
            FeatureEncoder::Label { codecs } => codecs.keys().cloned().collect(),
        }
    }

    /// Encode a validated applicant into a single-row feature table.
    pub fn encode(&self, record: &ApplicantRecord) -> Result<EncodedRow, PredictError> {
        let mut row = EncodedRow::default();
        for (name, value) in record.numeric_fields() {
            row.insert(name, value);
        }

        for (name, value) in record.categorical_fields() {
            match self {
                FeatureEncoder::Dummy { columns, unseen } => {
                    let Some(layout) = columns.get(name) else {
                        continue;
                    };
                    if value == layout.reference() {
                        continue;
                    }
                    if layout.is_known(value) {
                        row.insert(indicator_name(name, value), 1.0);
                        continue;
                    }
                    match unseen {
                        UnseenCategoryPolicy::FallbackToReference => {
                            debug!(
                                column = name,
                                value,
                                reference = layout.reference(),
                                "unseen category, falling back to reference"
                            );
                        }
                        UnseenCategoryPolicy::Reject => {
                            return Err(PredictError::Codec {
                                column: name.to_string(),
                                value: value.to_string(),
                            });
                        }
                    }
                }
                FeatureEncoder::Label { codecs } => {
                    if let Some(codec) = codecs.get(name) {
                        row.insert(name, codec.encode(name, value)?);
                    }
                }
            }
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn record(province: &str, history: &str) -> ApplicantRecord {
        let numeric = BTreeMap::from([("age".to_string(), 42.0), ("annual_income".to_string(), 80_000.0)]);
        let categorical = BTreeMap::from([
            ("province".to_string(), province.to_string()),
            ("payment_history".to_string(), history.to_string()),
        ]);
        ApplicantRecord::from_parts(numeric, categorical)
    }

    fn dummy(unseen: UnseenCategoryPolicy) -> FeatureEncoder {
        FeatureEncoder::Dummy {
            columns: BTreeMap::from([
                (
                    "province".to_string(),
                    DummyColumn::new(strings(&["AB", "BC", "ON"]), "AB"),
                ),
                (
                    "payment_history".to_string(),
                    DummyColumn::new(strings(&["Default", "Late", "On Time"]), "Default"),
                ),
            ]),
            unseen,
        }
    }

    fn label() -> FeatureEncoder {
        FeatureEncoder::Label {
            codecs: BTreeMap::from([
                ("province".to_string(), CategoricalCodec::new(strings(&["AB", "BC", "ON"]))),
                (
                    "payment_history".to_string(),
                    CategoricalCodec::new(strings(&["Default", "Late", "On Time"])),
                ),
            ]),
        }
    }

    #[test]
    fn label_codes_follow_class_order() {
        let row = label().encode(&record("ON", "Late")).unwrap();
        assert_eq!(row.get("province"), Some(2.0));
        assert_eq!(row.get("payment_history"), Some(1.0));
        assert_eq!(row.get("age"), Some(42.0));
        assert_eq!(row.get("annual_income"), Some(80_000.0));
    }

    #[test]
    fn label_rejects_unseen_category() {
        let err = label().encode(&record("QC", "Late")).unwrap_err();
        match err {
            PredictError::Codec { column, value } => {
                assert_eq!(column, "province");
                assert_eq!(value, "QC");
            }
            other => panic!("expected codec error, got {other:?}"),
        }
    }

    #[test]
    fn dummy_sets_only_the_matching_indicator() {
        let row = dummy(UnseenCategoryPolicy::FallbackToReference)
            .encode(&record("BC", "On Time"))
            .unwrap();
        assert_eq!(row.get("province_BC"), Some(1.0));
        assert_eq!(row.get("payment_history_On Time"), Some(1.0));
        assert!(!row.contains("province_ON"));
        assert!(!row.contains("province"));
    }

    #[test]
    fn dummy_reference_category_sets_nothing() {
        let row = dummy(UnseenCategoryPolicy::Reject)
            .encode(&record("AB", "Default"))
            .unwrap();
        assert_eq!(row.len(), 2);
        assert!(row.columns().all(|c| c == "age" || c == "annual_income"));
    }

    #[test]
    fn dummy_unseen_policy_is_explicit() {
        let row = dummy(UnseenCategoryPolicy::FallbackToReference)
            .encode(&record("QC", "Late"))
            .unwrap();
        assert!(row.columns().all(|c| !c.starts_with("province")));

        let err = dummy(UnseenCategoryPolicy::Reject)
            .encode(&record("QC", "Late"))
            .unwrap_err();
        assert!(matches!(err, PredictError::Codec { .. }));
    }

    #[test]
    fn policy_override_only_affects_dummy_encoding() {
        let enc = dummy(UnseenCategoryPolicy::FallbackToReference).with_unseen_policy(UnseenCategoryPolicy::Reject);
        assert_eq!(enc.unseen_policy(), Some(UnseenCategoryPolicy::Reject));
        assert_eq!(label().with_unseen_policy(UnseenCategoryPolicy::Reject).unseen_policy(), None);
    }

    #[test]
    fn produced_columns_skip_reference() {
        let cols = dummy(UnseenCategoryPolicy::Reject).produced_columns();
        assert_eq!(
            cols,
            strings(&["payment_history_Late", "payment_history_On Time", "province_BC", "province_ON"])
        );
    }
}
