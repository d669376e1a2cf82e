//! Output shaping and formatted terminal output.
//!
//! Formatting lives in one place so:
//! - the pipeline code stays free of presentation details
//! - rounding rules for the wire format are defined exactly once

use std::path::Path;

use crate::domain::{ApprovalDecision, ApprovalStatus, LoanEligibility, PredictionResult};
use crate::io::TrainedArtifact;
use crate::io::batch::BatchSummary;
use crate::models::StageOutput;

/// Decimal places used on the wire.
pub const SCORE_DECIMALS: i32 = 2;
pub const PROBABILITY_DECIMALS: i32 = 4;
pub const AMOUNT_DECIMALS: i32 = 2;
pub const RATE_DECIMALS: i32 = 2;

/// Round to `decimals` places, halves away from zero.
///
/// This is not half-to-even: `0.125` rounds to `0.13`, not `0.12`. Values too
/// large to scale are returned unchanged.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Shape raw stage output into the response record.
pub fn format_result(output: &StageOutput) -> PredictionResult {
    match *output {
        StageOutput::Decision {
            approved,
            probability,
        } => PredictionResult::Decision(ApprovalDecision {
            approval_status: ApprovalStatus::from_label(approved),
            approval_probability: round_to(probability.clamp(0.0, 1.0), PROBABILITY_DECIMALS),
        }),
        StageOutput::Eligibility {
            credit_score,
            probability,
            approved,
            approved_amount,
            interest_rate,
        } => PredictionResult::Eligibility(LoanEligibility {
            predicted_credit_score: round_to(credit_score, SCORE_DECIMALS),
            approval_probability: round_to(probability.clamp(0.0, 1.0), PROBABILITY_DECIMALS),
            is_approved: approved,
            approved_amount: if approved {
                round_to(approved_amount.max(0.0), AMOUNT_DECIMALS)
            } else {
                0.0
            },
            interest_rate: if approved {
                interest_rate.map(|r| round_to(r, RATE_DECIMALS))
            } else {
                None
            },
        }),
    }
}

/// Human-readable description of a loaded artifact (`credit inspect`).
pub fn format_artifact_summary(path: &Path, artifact: &TrainedArtifact) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== {} ===\n",
        artifact.variant.display_name()
    ));
    out.push_str(&format!("Artifact: {}\n", path.display()));
    if let Some(trained_at) = artifact.trained_at {
        out.push_str(&format!("Trained at: {}\n", trained_at.to_rfc3339()));
    }
    if let Some(description) = &artifact.description {
        out.push_str(&format!("Description: {description}\n"));
    }
    out.push_str(&format!(
        "Encoding: {} ({} categorical columns)\n",
        artifact.encoder.kind(),
        artifact.encoder.source_columns().len()
    ));
    if let Some(policy) = artifact.encoder.unseen_policy() {
        out.push_str(&format!("Unseen categories: {policy:?}\n"));
    }
    out.push_str(&format!(
        "Missing columns: {:?}{}\n",
        artifact.aligner.fill().missing_policy(),
        if artifact.aligner.has_snapshot() {
            " (training snapshot retained)"
        } else {
            ""
        }
    ));

    out.push_str("\nEstimators:\n");
    for info in &artifact.estimators {
        out.push_str(&format!("- {:<16} {}\n", info.role, info.summary));
    }

    out.push_str(&format!("\nSchema ({} columns):\n", artifact.n_features()));
    out.push_str(
        format!(
            "{:<32} {:>12} {:>12} {:>12} {:>10}\n",
            "column", "median", "mean", "scale", "default"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<32} {:-<12} {:-<12} {:-<12} {:-<10}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    let fill = artifact.aligner.fill();
    for (idx, column) in artifact.aligner.schema().iter().enumerate() {
        let default = fill.get(column).map(|v| format!("{v}")).unwrap_or_default();
        out.push_str(
            format!(
                "{:<32} {:>12.4} {:>12.4} {:>12.4} {:>10}\n",
                truncate(column, 32),
                artifact.imputer.medians()[idx],
                artifact.scaler.mean()[idx],
                artifact.scaler.scale()[idx],
                default,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// One-paragraph summary printed after `credit batch`.
pub fn format_batch_summary(summary: &BatchSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows: {} | scored: {} | approved: {} | validation errors: {} | codec errors: {} | failed: {}\n",
        summary.rows,
        summary.scored,
        summary.approved,
        summary.validation_errors,
        summary.codec_errors,
        summary.failed,
    ));
    if let Some(mean) = summary.mean_probability {
        out.push_str(&format!("Mean approval probability: {mean:.4}\n"));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
