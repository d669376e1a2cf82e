//! Batch CSV scoring.
//!
//! Input: a CSV whose headers are request field names. Each cell becomes a JSON
//! number when it parses as a finite number, otherwise a string; empty cells are
//! left out so the validator reports them as missing.
//!
//! Output: one row per input row, in input order, with a status column and the
//! variant's result fields. Row-level failures never abort the batch.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use serde_json::{Map, Number, Value};
use tracing::info;

use crate::app::PredictionService;
use crate::domain::{PredictionResult, ServiceVariant};
use crate::error::{AppError, PredictError};

/// One data row of the input CSV.
#[derive(Debug, Clone)]
pub struct ApplicantRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub fields: Map<String, Value>,
}

/// Outcome of scoring one row.
#[derive(Debug)]
pub struct RowOutcome {
    pub row: usize,
    pub result: Result<PredictionResult, PredictError>,
}

impl RowOutcome {
    pub fn status(&self) -> &'static str {
        match &self.result {
            Ok(_) => "ok",
            Err(PredictError::Validation(_)) => "validation_error",
            Err(PredictError::Codec { .. }) => "codec_error",
            Err(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub rows: usize,
    pub scored: usize,
    pub approved: usize,
    pub validation_errors: usize,
    pub codec_errors: usize,
    pub failed: usize,
    pub mean_probability: Option<f64>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[RowOutcome]) -> Self {
        let mut summary = BatchSummary {
            rows: outcomes.len(),
            ..BatchSummary::default()
        };
        let mut probability_sum = 0.0;

        for outcome in outcomes {
            match &outcome.result {
                Ok(result) => {
                    summary.scored += 1;
                    if result.is_approved() {
                        summary.approved += 1;
                    }
                    probability_sum += result.approval_probability();
                }
                Err(PredictError::Validation(_)) => summary.validation_errors += 1,
                Err(PredictError::Codec { .. }) => summary.codec_errors += 1,
                Err(_) => summary.failed += 1,
            }
        }

        if summary.scored > 0 {
            summary.mean_probability = Some(probability_sum / summary.scored as f64);
        }
        summary
    }
}

/// Interpret one CSV cell.
pub fn parse_cell(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(Value::Number(v.into()));
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Some(Value::Number(n));
    }
    Some(Value::String(raw.to_string()))
}

/// Read applicant rows from a CSV file.
pub fn read_applicants(path: &Path) -> Result<Vec<ApplicantRow>, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let headers = rdr
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record
            .map_err(|e| AppError::new(2, format!("Failed to read CSV row {}: {e}", idx + 1)))?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .filter_map(|(name, cell)| parse_cell(cell).map(|v| (name.to_string(), v)))
            .collect();
        rows.push(ApplicantRow {
            row: idx + 1,
            fields,
        });
    }
    Ok(rows)
}

/// Score every row in parallel; the output keeps input order.
pub fn score_rows(service: &PredictionService, rows: &[ApplicantRow]) -> Vec<RowOutcome> {
    let profile = service.profile();
    rows.par_iter()
        .map(|r| RowOutcome {
            row: r.row,
            result: profile
                .validate(&r.fields)
                .map_err(PredictError::from)
                .and_then(|record| service.predict(&record)),
        })
        .collect()
}

fn header(variant: ServiceVariant) -> &'static [&'static str] {
    match variant {
        ServiceVariant::Simple => &["row", "status", "approval_status", "approval_probability", "error"],
        ServiceVariant::MultiStage => &[
            "row",
            "status",
            "predicted_credit_score",
            "approval_probability",
            "is_approved",
            "approved_amount",
            "interest_rate",
            "error",
        ],
    }
}

fn result_cells(variant: ServiceVariant, result: Option<&PredictionResult>) -> Vec<String> {
    match (variant, result) {
        (_, Some(PredictionResult::Decision(d))) => vec![
            d.approval_status.as_str().to_string(),
            d.approval_probability.to_string(),
        ],
        (_, Some(PredictionResult::Eligibility(e))) => vec![
            e.predicted_credit_score.to_string(),
            e.approval_probability.to_string(),
            e.is_approved.to_string(),
            e.approved_amount.to_string(),
            e.interest_rate.map(|r| r.to_string()).unwrap_or_default(),
        ],
        (ServiceVariant::Simple, None) => vec![String::new(); 2],
        (ServiceVariant::MultiStage, None) => vec![String::new(); 5],
    }
}

/// Write scored rows as CSV.
pub fn write_results<W: Write>(
    writer: W,
    variant: ServiceVariant,
    outcomes: &[RowOutcome],
) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(variant))
        .map_err(|e| AppError::new(4, format!("Failed to write results header: {e}")))?;

    for outcome in outcomes {
        let mut record = vec![outcome.row.to_string(), outcome.status().to_string()];
        record.extend(result_cells(variant, outcome.result.as_ref().ok()));
        record.push(
            outcome
                .result
                .as_ref()
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        );
        wtr.write_record(&record)
            .map_err(|e| AppError::new(4, format!("Failed to write results row {}: {e}", outcome.row)))?;
    }

    wtr.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush results: {e}")))?;
    Ok(())
}

/// Read `input`, score it, write `output` (or stdout), and summarize.
pub fn run_batch(
    service: &PredictionService,
    input: &Path,
    output: Option<&Path>,
) -> Result<BatchSummary, AppError> {
    let rows = read_applicants(input)?;
    let outcomes = score_rows(service, &rows);
    let summary = BatchSummary::from_outcomes(&outcomes);

    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(4, format!("Failed to create results CSV '{}': {e}", path.display()))
            })?;
            write_results(file, service.variant(), &outcomes)?;
        }
        None => write_results(std::io::stdout().lock(), service.variant(), &outcomes)?,
    }

    info!(
        rows = summary.rows,
        scored = summary.scored,
        approved = summary.approved,
        "batch scored"
    );
    Ok(summary)
}
