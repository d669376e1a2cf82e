//! Shared prediction workflow used by the HTTP server, `predict` and `batch`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate -> encode -> align -> impute -> scale -> infer -> format
//!
//! The front-ends can then focus on transport (HTTP, files, stdout).

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::domain::{ApplicantRecord, PredictionResult, ServiceVariant, UnseenCategoryPolicy};
use crate::error::{AppError, PredictError};
use crate::io::applicant::ValidationProfile;
use crate::io::{TrainedArtifact, load_artifact};

/// A loaded artifact plus the request contract of its variant.
///
/// Read-only after construction, so one instance can be shared across worker
/// threads behind an `Arc`.
#[derive(Debug)]
pub struct PredictionService {
    artifact: TrainedArtifact,
    profile: ValidationProfile,
}

impl PredictionService {
    pub fn from_artifact(artifact: TrainedArtifact) -> Self {
        let profile = ValidationProfile::for_variant(artifact.variant);
        Self { artifact, profile }
    }

    /// Load the artifact at `path`, optionally overriding its unseen-category policy.
    pub fn load(path: &Path, unseen: Option<UnseenCategoryPolicy>) -> Result<Self, AppError> {
        let mut artifact = load_artifact(path)?;
        if let Some(policy) = unseen {
            artifact = artifact.with_unseen_policy(policy);
        }
        Ok(Self::from_artifact(artifact))
    }

    pub fn variant(&self) -> ServiceVariant {
        self.artifact.variant
    }

    pub fn profile(&self) -> &ValidationProfile {
        &self.profile
    }

    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }

    /// Validate a raw request body, then predict.
    pub fn predict_value(&self, raw: &Value) -> Result<PredictionResult, PredictError> {
        let record = self.profile.validate_value(raw)?;
        self.predict(&record)
    }

    /// Run a validated applicant through the pipeline.
    pub fn predict(&self, record: &ApplicantRecord) -> Result<PredictionResult, PredictError> {
        let artifact = &self.artifact;

        let row = artifact.encoder.encode(record)?;
        let dropped = artifact.aligner.dropped_columns(&row);
        if !dropped.is_empty() {
            debug!(?dropped, "dropping columns unknown to the training schema");
        }

        let x = artifact.aligner.align(&row)?;
        let x = artifact.imputer.impute(x)?;
        let x = artifact.scaler.transform(x)?;
        let output = artifact.stage.run(&x)?;
        let result = crate::report::format_result(&output);

        debug!(
            province = record.province().unwrap_or(""),
            approved = result.is_approved(),
            probability = result.approval_probability(),
            "scored applicant"
        );
        Ok(result)
    }
}
