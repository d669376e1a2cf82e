//! Shared test fixtures: small hand-built artifacts and valid requests.
//!
//! The artifacts are tiny but structurally complete, and their outputs are easy
//! to work out by hand:
//!
//! - simple: dummy encoding (provinces AB/BC/ON/QC seen in training, reference
//!   AB) feeding a logistic regression
//! - multi-stage: label encoding (same provinces) feeding two boosted stumps,
//!   a two-tree forest and a linear rate model; a training snapshot covers
//!   `age` and `dti`

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::app::PredictionService;
use crate::domain::{MissingColumnPolicy, ServiceVariant, UnseenCategoryPolicy};
use crate::features::{CategoricalCodec, DefaultFill, DummyColumn, FeatureEncoder, indicator_name};
use crate::io::{ArtifactFile, EstimatorSet, FORMAT_VERSION, TrainedArtifact, TrainingSnapshot};
use crate::math::{MedianImputer, StandardScaler};
use crate::models::{DecisionTree, EstimatorSpec, TreeNode};

pub const TRAINED_PROVINCES: [&str; 4] = ["AB", "BC", "ON", "QC"];

/// `(column, median, mean, scale)` for the numeric columns of each variant.
const SIMPLE_NUMERIC: [(&str, f64, f64, f64); 13] = [
    ("self_reported_expenses", 1_800.0, 2_000.0, 900.0),
    ("credit_score", 680.0, 670.0, 80.0),
    ("annual_income", 52_000.0, 55_000.0, 20_000.0),
    ("self_reported_debt", 8_000.0, 10_000.0, 8_000.0),
    ("requested_amount", 12_000.0, 15_000.0, 9_000.0),
    ("age", 38.0, 40.0, 12.0),
    ("months_employed", 36.0, 48.0, 40.0),
    ("credit_utilization", 32.0, 35.0, 20.0),
    ("num_open_accounts", 4.0, 4.5, 2.5),
    ("num_credit_inquiries", 1.0, 1.5, 1.4),
    ("current_credit_limit", 15_000.0, 18_000.0, 9_000.0),
    ("monthly_expenses", 2_200.0, 2_400.0, 1_000.0),
    ("estimated_debt", 9_000.0, 11_000.0, 8_500.0),
];

const MULTI_STAGE_COLUMNS: [(&str, f64, f64, f64); 16] = [
    ("age", 38.0, 40.0, 12.0),
    ("province", 2.0, 1.5, 1.1),
    ("employment_status", 0.0, 0.8, 1.0),
    ("months_employed", 36.0, 48.0, 40.0),
    ("annual_income", 52_000.0, 55_000.0, 20_000.0),
    ("self_reported_debt", 8_000.0, 10_000.0, 8_000.0),
    ("self_reported_expenses", 1_800.0, 2_000.0, 900.0),
    ("total_credit_limit", 15_000.0, 18_000.0, 9_000.0),
    ("credit_utilization", 32.0, 35.0, 20.0),
    ("num_open_accounts", 4.0, 4.5, 2.5),
    ("num_credit_inquiries", 1.0, 1.5, 1.4),
    ("monthly_expenses", 2_200.0, 2_400.0, 1_000.0),
    ("dti", 28.0, 30.0, 12.0),
    ("payment_history", 2.0, 1.6, 0.6),
    ("requested_amount", 12_000.0, 15_000.0, 9_000.0),
    ("estimated_debt", 9_000.0, 11_000.0, 8_500.0),
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

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

fn coefficients(schema: &[String], weights: &[(&str, f64)]) -> Vec<f64> {
    let weights: BTreeMap<&str, f64> = weights.iter().copied().collect();
    schema
        .iter()
        .map(|c| weights.get(c.as_str()).copied().unwrap_or(0.0))
        .collect()
}

pub fn simple_artifact_file() -> ArtifactFile {
    let columns = BTreeMap::from([
        (
            "province".to_string(),
            DummyColumn::new(strings(&TRAINED_PROVINCES), "AB"),
        ),
        (
            "employment_status".to_string(),
            DummyColumn::new(
                strings(&["Full-time", "Part-time", "Self-employed", "Student", "Unemployed"]),
                "Full-time",
            ),
        ),
        (
            "payment_history".to_string(),
            DummyColumn::new(strings(&["Default", "Late", "On Time"]), "Default"),
        ),
    ]);
    let encoding = FeatureEncoder::Dummy {
        columns,
        unseen: UnseenCategoryPolicy::FallbackToReference,
    };

    let mut schema: Vec<String> = SIMPLE_NUMERIC.iter().map(|(c, ..)| c.to_string()).collect();
    let indicators = encoding.produced_columns();
    schema.extend(indicators.iter().cloned());

    let mut medians: Vec<f64> = SIMPLE_NUMERIC.iter().map(|(_, m, ..)| *m).collect();
    let mut mean: Vec<f64> = SIMPLE_NUMERIC.iter().map(|(_, _, m, _)| *m).collect();
    let mut scale: Vec<f64> = SIMPLE_NUMERIC.iter().map(|(.., s)| *s).collect();
    medians.extend(indicators.iter().map(|_| 0.0));
    mean.extend(indicators.iter().map(|_| 0.25));
    scale.extend(indicators.iter().map(|_| 0.43));

    let approval = EstimatorSpec::LogisticRegression {
        coefficients: coefficients(
            &schema,
            &[
                ("credit_score", 1.2),
                ("annual_income", 0.6),
                ("credit_utilization", -0.8),
                ("num_credit_inquiries", -0.3),
                (indicator_name("payment_history", "On Time").as_str(), 0.9),
            ],
        ),
        intercept: 0.2,
    };

    ArtifactFile {
        format_version: FORMAT_VERSION,
        variant: ServiceVariant::Simple,
        trained_at: None,
        description: Some("fixture: simple approval classifier".to_string()),
        schema,
        encoding,
        alignment: DefaultFill::new(MissingColumnPolicy::Zero),
        imputer: Some(MedianImputer::new(medians)),
        scaler: Some(StandardScaler::new(mean, scale)),
        estimators: EstimatorSet {
            approval: Some(approval),
            ..EstimatorSet::default()
        },
        training_snapshot: None,
    }
}

pub fn multi_stage_artifact_file() -> ArtifactFile {
    let schema: Vec<String> = MULTI_STAGE_COLUMNS.iter().map(|(c, ..)| c.to_string()).collect();
    let idx = |name: &str| schema.iter().position(|c| c == name).unwrap_or(usize::MAX);
    let utilization = idx("credit_utilization");
    let history = idx("payment_history");
    let income = idx("annual_income");

    let encoding = FeatureEncoder::Label {
        codecs: BTreeMap::from([
            (
                "province".to_string(),
                CategoricalCodec::new(strings(&TRAINED_PROVINCES)),
            ),
            (
                "employment_status".to_string(),
                CategoricalCodec::new(strings(&["Employed", "Self-Employed", "Student", "Unemployed"])),
            ),
            (
                "payment_history".to_string(),
                CategoricalCodec::new(strings(&["Default", "Late", "On Time"])),
            ),
        ]),
    };

    let estimators = EstimatorSet {
        credit_score: Some(EstimatorSpec::GradientBoostingRegressor {
            init: 680.0,
            learning_rate: 0.1,
            trees: vec![
                stump(history, 0.0, vec![-300.0], vec![200.0]),
                stump(utilization, 0.0, vec![100.0], vec![-150.0]),
            ],
        }),
        approval: Some(EstimatorSpec::RandomForestClassifier {
            trees: vec![
                stump(utilization, 0.0, vec![1.0, 9.0], vec![7.0, 3.0]),
                stump(history, 0.0, vec![8.0, 2.0], vec![2.0, 8.0]),
            ],
        }),
        approved_amount: Some(EstimatorSpec::GradientBoostingRegressor {
            init: 15_000f64.ln_1p(),
            learning_rate: 0.1,
            trees: vec![stump(income, 0.0, vec![-2.0], vec![3.0])],
        }),
        interest_rate: Some(EstimatorSpec::LinearRegression {
            coefficients: coefficients(&schema, &[("credit_utilization", 0.8), ("dti", 0.5)]),
            intercept: 9.5,
        }),
    };

    ArtifactFile {
        format_version: FORMAT_VERSION,
        variant: ServiceVariant::MultiStage,
        trained_at: None,
        description: Some("fixture: multi-stage loan eligibility".to_string()),
        schema,
        encoding,
        alignment: DefaultFill::new(MissingColumnPolicy::SnapshotMedian),
        imputer: Some(MedianImputer::new(
            MULTI_STAGE_COLUMNS.iter().map(|(_, m, ..)| *m).collect(),
        )),
        scaler: Some(StandardScaler::new(
            MULTI_STAGE_COLUMNS.iter().map(|(_, _, m, _)| *m).collect(),
            MULTI_STAGE_COLUMNS.iter().map(|(.., s)| *s).collect(),
        )),
        estimators,
        training_snapshot: Some(TrainingSnapshot {
            columns: strings(&["age", "dti"]),
            rows: vec![
                vec![Some(30.0), Some(20.0)],
                vec![Some(40.0), Some(30.0)],
                vec![Some(50.0), None],
            ],
        }),
    }
}

pub fn simple_artifact() -> TrainedArtifact {
    TrainedArtifact::from_file(simple_artifact_file()).expect("simple fixture artifact is valid")
}

pub fn multi_stage_artifact() -> TrainedArtifact {
    TrainedArtifact::from_file(multi_stage_artifact_file()).expect("multi-stage fixture artifact is valid")
}

pub fn simple_service() -> PredictionService {
    PredictionService::from_artifact(simple_artifact())
}

pub fn multi_stage_service() -> PredictionService {
    PredictionService::from_artifact(multi_stage_artifact())
}

/// Valid simple-variant request; approved by the simple fixture (p ≈ 0.965).
pub fn simple_request() -> Value {
    json!({
        "self_reported_expenses": 1500,
        "credit_score": 720,
        "annual_income": 65000,
        "self_reported_debt": 5000,
        "requested_amount": 10000,
        "age": 35,
        "province": "on",
        "employment_status": "Full-time",
        "months_employed": 48,
        "credit_utilization": 25,
        "num_open_accounts": 4,
        "num_credit_inquiries": 1,
        "payment_history": "On Time",
        "current_credit_limit": 15000,
        "monthly_expenses": 2000,
        "estimated_debt": 6000
    })
}

/// Valid multi-stage request; approved by the multi-stage fixture.
///
/// Expected: score 710, probability 0.85, amount ≈ 20 248.33, rate ≈ 8.68.
pub fn multi_stage_request() -> Value {
    json!({
        "age": 35,
        "province": "on",
        "employment_status": "Employed",
        "months_employed": 48,
        "annual_income": 65000,
        "self_reported_debt": 5000,
        "self_reported_expenses": 1500,
        "total_credit_limit": 15000,
        "credit_utilization": 25,
        "num_open_accounts": 4,
        "num_credit_inquiries": 1,
        "monthly_expenses": 2000,
        "dti": 20,
        "payment_history": "On Time",
        "requested_amount": 10000,
        "estimated_debt": 6000
    })
}

/// Valid multi-stage request denied by the fixture (score 635, p = 0.25).
pub fn denied_multi_stage_request() -> Value {
    let mut request = multi_stage_request();
    request["credit_utilization"] = json!(90);
    request["payment_history"] = json!("Late");
    request
}
