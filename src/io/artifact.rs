//! Trained-artifact loading.
//!
//! The artifact is the JSON bundle written by the offline training job:
//! schema, categorical encoding, default-fill table, imputer, scaler,
//! estimators and (optionally) a retained training snapshot.
//!
//! Loading happens once per process, before any request is served. Every
//! structural check happens here so the request path can index by position
//! without re-validating:
//! - all per-column vectors match the schema width
//! - every encoded column is a schema column
//! - every categorical request field has an encoding
//! - the estimators required by the variant are present and well-formed

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{MissingColumnPolicy, ServiceVariant, UnseenCategoryPolicy};
use crate::error::LoadError;
use crate::features::{DefaultFill, FeatureAligner, FeatureEncoder};
use crate::io::applicant::ValidationProfile;
use crate::math::{MedianImputer, StandardScaler, median};
use crate::models::{EstimatorSpec, InferenceStage};

/// Artifact format understood by this build.
pub const FORMAT_VERSION: u32 = 1;

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub format_version: u32,
    pub variant: ServiceVariant,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    pub schema: Vec<String>,
    pub encoding: FeatureEncoder,
    #[serde(default)]
    pub alignment: DefaultFill,
    #[serde(default)]
    pub imputer: Option<MedianImputer>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    #[serde(default)]
    pub estimators: EstimatorSet,
    #[serde(default)]
    pub training_snapshot: Option<TrainingSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatorSet {
    #[serde(default)]
    pub approval: Option<EstimatorSpec>,
    #[serde(default)]
    pub credit_score: Option<EstimatorSpec>,
    #[serde(default)]
    pub approved_amount: Option<EstimatorSpec>,
    #[serde(default)]
    pub interest_rate: Option<EstimatorSpec>,
}

/// Retained copy of (part of) the training data, used for median fallback.
///
/// `null` cells are missing values and are ignored by the median.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl TrainingSnapshot {
    /// Per-column medians, computed once at load.
    pub fn medians(&self) -> Result<BTreeMap<String, f64>, LoadError> {
        let width = self.columns.len();
        if let Some(idx) = self.rows.iter().position(|r| r.len() != width) {
            return Err(LoadError::Inconsistent(format!(
                "training snapshot row {idx} has {} cells, expected {width}",
                self.rows[idx].len()
            )));
        }

        let mut out = BTreeMap::new();
        for (col_idx, column) in self.columns.iter().enumerate() {
            let mut values: Vec<f64> = self.rows.iter().filter_map(|r| r[col_idx]).collect();
            if let Some(m) = median(&mut values) {
                out.insert(column.clone(), m);
            }
        }
        Ok(out)
    }
}

/// Estimator summary line for reporting (`role`, description).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorInfo {
    pub role: &'static str,
    pub summary: String,
}

/// A loaded, validated artifact. Read-only after construction.
#[derive(Debug)]
pub struct TrainedArtifact {
    pub variant: ServiceVariant,
    pub trained_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub encoder: FeatureEncoder,
    pub aligner: FeatureAligner,
    pub imputer: MedianImputer,
    pub scaler: StandardScaler,
    pub stage: InferenceStage,
    pub estimators: Vec<EstimatorInfo>,
}

impl TrainedArtifact {
    /// Validate a parsed artifact and assemble the pipeline components.
    pub fn from_file(file: ArtifactFile) -> Result<Self, LoadError> {
        if file.format_version != FORMAT_VERSION {
            return Err(LoadError::Version {
                found: file.format_version,
                expected: FORMAT_VERSION,
            });
        }

        let n_features = file.schema.len();
        let imputer = file
            .imputer
            .ok_or_else(|| LoadError::Missing("imputer".to_string()))?;
        imputer.check_len(n_features)?;
        let scaler = file
            .scaler
            .ok_or_else(|| LoadError::Missing("scaler".to_string()))?;
        scaler.check_len(n_features)?;

        check_encoding(&file.encoding, &file.schema, file.variant)?;

        // Indicator columns back-fill with zero; make that visible in the table.
        let mut fill = file.alignment;
        if let FeatureEncoder::Dummy { .. } = &file.encoding {
            for column in file.encoding.produced_columns() {
                fill.insert_if_absent(&column, 0.0);
            }
        }

        let snapshot_medians = match &file.training_snapshot {
            Some(snapshot) => Some(snapshot.medians()?),
            None => None,
        };
        if fill.missing_policy() == MissingColumnPolicy::SnapshotMedian && snapshot_medians.is_none() {
            warn!("artifact falls back to snapshot medians but carries no training snapshot");
        }

        let aligner = FeatureAligner::new(file.schema, fill, snapshot_medians)?;
        let (stage, estimators) = build_stage(file.variant, file.estimators, n_features)?;

        Ok(Self {
            variant: file.variant,
            trained_at: file.trained_at,
            description: file.description,
            encoder: file.encoding,
            aligner,
            imputer,
            scaler,
            stage,
            estimators,
        })
    }

    /// Override the dummy encoder's unseen-category policy.
    pub fn with_unseen_policy(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.encoder = self.encoder.with_unseen_policy(policy);
        self
    }

    pub fn n_features(&self) -> usize {
        self.aligner.len()
    }
}

/// Read, parse and validate an artifact file.
pub fn load_artifact(path: &Path) -> Result<TrainedArtifact, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ArtifactFile = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact = TrainedArtifact::from_file(file)?;

    info!(
        path = %path.display(),
        variant = artifact.variant.as_str(),
        features = artifact.n_features(),
        encoding = artifact.encoder.kind(),
        "loaded trained artifact"
    );
    Ok(artifact)
}

fn check_encoding(
    encoding: &FeatureEncoder,
    schema: &[String],
    variant: ServiceVariant,
) -> Result<(), LoadError> {
    if let FeatureEncoder::Dummy { columns, .. } = encoding {
        for (name, layout) in columns {
            if !layout.categories().iter().any(|c| c == layout.reference()) {
                return Err(LoadError::Inconsistent(format!(
                    "reference category '{}' of '{name}' is not among its categories",
                    layout.reference()
                )));
            }
        }
    }

    for column in encoding.produced_columns() {
        if !schema.contains(&column) {
            return Err(LoadError::Inconsistent(format!(
                "encoded column '{column}' is not a schema column"
            )));
        }
    }

    let known = encoding.source_columns();
    for field in ValidationProfile::for_variant(variant).categorical_fields() {
        if !known.contains(&field) {
            return Err(LoadError::Inconsistent(format!(
                "categorical field '{field}' has no encoding"
            )));
        }
    }
    Ok(())
}

fn take_estimator(
    role: &'static str,
    spec: Option<EstimatorSpec>,
    n_features: usize,
    classifier: bool,
    info: &mut Vec<EstimatorInfo>,
) -> Result<EstimatorSpec, LoadError> {
    let spec = spec.ok_or_else(|| LoadError::Missing(format!("estimator '{role}'")))?;
    spec.check(n_features)
        .map_err(|e| LoadError::Inconsistent(format!("estimator '{role}': {e}")))?;
    if spec.is_classifier() != classifier {
        let expected = if classifier { "a classifier" } else { "a regressor" };
        return Err(LoadError::Inconsistent(format!(
            "estimator '{role}' must be {expected}, got {}",
            spec.kind()
        )));
    }
    info.push(EstimatorInfo {
        role,
        summary: spec.summary(),
    });
    Ok(spec)
}

fn build_stage(
    variant: ServiceVariant,
    set: EstimatorSet,
    n_features: usize,
) -> Result<(InferenceStage, Vec<EstimatorInfo>), LoadError> {
    let mut info = Vec::new();
    let stage = match variant {
        ServiceVariant::Simple => InferenceStage::Simple {
            approval: Box::new(take_estimator("approval", set.approval, n_features, true, &mut info)?),
        },
        ServiceVariant::MultiStage => InferenceStage::MultiStage {
            credit_score: Box::new(take_estimator(
                "credit_score",
                set.credit_score,
                n_features,
                false,
                &mut info,
            )?),
            approval: Box::new(take_estimator("approval", set.approval, n_features, true, &mut info)?),
            approved_amount: Box::new(take_estimator(
                "approved_amount",
                set.approved_amount,
                n_features,
                false,
                &mut info,
            )?),
            interest_rate: Box::new(take_estimator(
                "interest_rate",
                set.interest_rate,
                n_features,
                false,
                &mut info,
            )?),
        },
    };
    Ok((stage, info))
}
