//! Shared domain types.
//!
//! These types are intentionally small and serializable so they can be:
//!
//! - passed through the serving pipeline without copying request maps around
//! - written as HTTP responses or batch CSV rows
//! - read back by the remote client

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Province and territory codes accepted by the validator (uppercase).
pub const PROVINCES: [&str; 13] = [
    "ON", "QC", "BC", "AB", "MB", "SK", "NS", "NB", "NL", "PE", "YT", "NT", "NU",
];

/// Which trained-model family the artifact carries.
///
/// The two families share validation, alignment and scaling; they differ in the
/// request contract, the categorical encoding and the inference stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ServiceVariant {
    /// Single binary approve/deny classifier.
    Simple,
    /// Credit score, approval, approved amount and interest rate.
    MultiStage,
}

impl ServiceVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceVariant::Simple => "simple",
            ServiceVariant::MultiStage => "multi_stage",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ServiceVariant::Simple => "Credit approval (binary classifier)",
            ServiceVariant::MultiStage => "Line of credit (multi-stage)",
        }
    }
}

/// What the dummy encoder does with a category value never seen during training.
///
/// Label encoding always rejects unseen values; this knob only exists for
/// indicator encoding, where "no indicator set" silently means the reference
/// category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    /// Emit no indicator, i.e. treat the value as the reference category.
    #[default]
    FallbackToReference,
    /// Fail the request with a codec error.
    Reject,
}

/// How the aligner fills a schema column that the encoded row does not carry
/// and the default table does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Plain `0.0`.
    #[default]
    Zero,
    /// Median of the retained training snapshot (error if there is none).
    SnapshotMedian,
    /// Leave the value missing so the persisted imputer fills it.
    Impute,
}

/// A validated applicant.
///
/// Built only by the schema validator; numeric fields and categorical fields
/// are kept apart so the encoder never has to guess a value's type. Categorical
/// values are already normalized (e.g. province uppercased).
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantRecord {
    numeric: BTreeMap<String, f64>,
    categorical: BTreeMap<String, String>,
}

impl ApplicantRecord {
    pub(crate) fn from_parts(
        numeric: BTreeMap<String, f64>,
        categorical: BTreeMap<String, String>,
    ) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    pub fn numeric(&self, field: &str) -> Option<f64> {
        self.numeric.get(field).copied()
    }

    pub fn categorical(&self, field: &str) -> Option<&str> {
        self.categorical.get(field).map(String::as_str)
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.numeric.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn categorical_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categorical.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn province(&self) -> Option<&str> {
        self.categorical("province")
    }
}

/// Outward approval label of the binary classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Approved,
    Denied,
}

impl ApprovalStatus {
    pub fn from_label(approved: bool) -> Self {
        if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Denied
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Denied => "Denied",
        }
    }
}

/// Response of the binary classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approval_status: ApprovalStatus,
    pub approval_probability: f64,
}

/// Response of the multi-stage model.
///
/// `interest_rate` serializes as `null` when the application is not approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEligibility {
    pub predicted_credit_score: f64,
    pub approval_probability: f64,
    pub is_approved: bool,
    pub approved_amount: f64,
    pub interest_rate: Option<f64>,
}

/// Final per-request output in its response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Eligibility(LoanEligibility),
    Decision(ApprovalDecision),
}

impl PredictionResult {
    pub fn approval_probability(&self) -> f64 {
        match self {
            PredictionResult::Decision(d) => d.approval_probability,
            PredictionResult::Eligibility(e) => e.approval_probability,
        }
    }

    pub fn is_approved(&self) -> bool {
        match self {
            PredictionResult::Decision(d) => d.approval_status == ApprovalStatus::Approved,
            PredictionResult::Eligibility(e) => e.is_approved,
        }
    }
}

/// Serve configuration as understood by the hosting layer.
///
/// Derived from CLI flags, then the environment (`.env`), then defaults.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub artifact: PathBuf,
    pub bind: SocketAddr,
    /// Allowed CORS origins; empty means permissive.
    pub cors_origins: Vec<String>,
    /// Overrides the artifact's unseen-category policy when set.
    pub unseen_category: Option<UnseenCategoryPolicy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_serializes_missing_rate_as_null() {
        let result = PredictionResult::Eligibility(LoanEligibility {
            predicted_credit_score: 701.25,
            approval_probability: 0.1234,
            is_approved: false,
            approved_amount: 0.0,
            interest_rate: None,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["interest_rate"], serde_json::Value::Null);
        assert_eq!(json["is_approved"], false);
        assert!(!result.is_approved());
    }

    #[test]
    fn decision_uses_human_readable_status() {
        let result = PredictionResult::Decision(ApprovalDecision {
            approval_status: ApprovalStatus::from_label(true),
            approval_probability: 0.91,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["approval_status"], "Approved");
        assert!(result.is_approved());
    }

    #[test]
    fn untagged_result_reads_back_the_right_shape() {
        let decision: PredictionResult =
            serde_json::from_str(r#"{"approval_status":"Denied","approval_probability":0.2}"#).unwrap();
        assert!(matches!(decision, PredictionResult::Decision(_)));

        let eligibility: PredictionResult = serde_json::from_str(
            r#"{"predicted_credit_score":650.0,"approval_probability":0.7,"is_approved":true,
                "approved_amount":5000.0,"interest_rate":7.5}"#,
        )
        .unwrap();
        assert!(matches!(eligibility, PredictionResult::Eligibility(_)));
    }
}
