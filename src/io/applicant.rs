//! Request validation.
//!
//! This module turns an untyped JSON object into an `ApplicantRecord` that is
//! safe to encode, or into one aggregated `ValidationErrors` naming every field
//! that broke its rule.
//!
//! Design goals:
//! - **Table-driven rules**: each service variant has a `ValidationProfile`
//!   (a static list of `FieldRule`s), so both request contracts share one checker
//! - **Collect, don't short-circuit**: all violations are reported together
//! - **Ignore extras**: unknown fields are dropped, never rejected
//! - **Normalize once**: province is trimmed and uppercased here and nowhere else

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::domain::{ApplicantRecord, PROVINCES, ServiceVariant};
use crate::error::{FieldError, ValidationErrors};

/// Employment labels accepted by the binary credit-approval contract.
pub const EMPLOYMENT_STATUSES_SIMPLE: &[&str] =
    &["Full-time", "Part-time", "Unemployed", "Self-employed", "Student"];

/// Employment labels accepted by the line-of-credit contract.
pub const EMPLOYMENT_STATUSES_MULTI_STAGE: &[&str] =
    &["Employed", "Self-Employed", "Unemployed", "Student"];

pub const PAYMENT_HISTORIES: &[&str] = &["On Time", "Late", "Default"];

/// Type of value a field must carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// JSON number with no fractional part.
    Integer,
    /// Any finite JSON number.
    Number,
    /// Province/territory code, case-insensitive on input.
    Province,
    /// Exact (case-sensitive) member of a fixed label set.
    OneOf(&'static [&'static str]),
}

/// Constraint on a single request field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldRule {
    const fn integer(name: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            min,
            max,
        }
    }

    const fn number(name: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
            min,
            max,
        }
    }

    const fn province(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Province,
            min: None,
            max: None,
        }
    }

    const fn one_of(name: &'static str, allowed: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::OneOf(allowed),
            min: None,
            max: None,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FieldKind::Province | FieldKind::OneOf(_))
    }
}

const NON_NEGATIVE: Option<f64> = Some(0.0);
const PERCENT_MAX: Option<f64> = Some(100.0);

static SIMPLE_RULES: [FieldRule; 16] = [
    FieldRule::number("self_reported_expenses", NON_NEGATIVE, None),
    FieldRule::integer("credit_score", Some(300.0), Some(900.0)),
    FieldRule::number("annual_income", NON_NEGATIVE, None),
    FieldRule::number("self_reported_debt", NON_NEGATIVE, None),
    FieldRule::number("requested_amount", NON_NEGATIVE, None),
    FieldRule::integer("age", Some(18.0), Some(100.0)),
    FieldRule::province("province"),
    FieldRule::one_of("employment_status", EMPLOYMENT_STATUSES_SIMPLE),
    FieldRule::integer("months_employed", NON_NEGATIVE, None),
    FieldRule::number("credit_utilization", NON_NEGATIVE, PERCENT_MAX),
    FieldRule::integer("num_open_accounts", NON_NEGATIVE, None),
    FieldRule::integer("num_credit_inquiries", NON_NEGATIVE, None),
    FieldRule::one_of("payment_history", PAYMENT_HISTORIES),
    FieldRule::number("current_credit_limit", NON_NEGATIVE, None),
    FieldRule::number("monthly_expenses", NON_NEGATIVE, None),
    FieldRule::number("estimated_debt", NON_NEGATIVE, None),
];

static MULTI_STAGE_RULES: [FieldRule; 16] = [
    FieldRule::integer("age", Some(18.0), Some(100.0)),
    FieldRule::province("province"),
    FieldRule::one_of("employment_status", EMPLOYMENT_STATUSES_MULTI_STAGE),
    FieldRule::integer("months_employed", NON_NEGATIVE, None),
    FieldRule::number("annual_income", NON_NEGATIVE, None),
    FieldRule::number("self_reported_debt", NON_NEGATIVE, None),
    FieldRule::number("self_reported_expenses", NON_NEGATIVE, None),
    FieldRule::number("total_credit_limit", NON_NEGATIVE, None),
    FieldRule::number("credit_utilization", NON_NEGATIVE, PERCENT_MAX),
    FieldRule::integer("num_open_accounts", NON_NEGATIVE, None),
    FieldRule::integer("num_credit_inquiries", NON_NEGATIVE, None),
    FieldRule::number("monthly_expenses", NON_NEGATIVE, None),
    FieldRule::number("dti", NON_NEGATIVE, PERCENT_MAX),
    FieldRule::one_of("payment_history", PAYMENT_HISTORIES),
    FieldRule::number("requested_amount", NON_NEGATIVE, None),
    FieldRule::number("estimated_debt", NON_NEGATIVE, None),
];

/// The field contract of one service variant.
#[derive(Debug, Clone, Copy)]
pub struct ValidationProfile {
    variant: ServiceVariant,
    rules: &'static [FieldRule],
}

impl ValidationProfile {
    pub fn for_variant(variant: ServiceVariant) -> Self {
        let rules: &'static [FieldRule] = match variant {
            ServiceVariant::Simple => &SIMPLE_RULES,
            ServiceVariant::MultiStage => &MULTI_STAGE_RULES,
        };
        Self { variant, rules }
    }

    pub fn variant(&self) -> ServiceVariant {
        self.variant
    }

    pub fn rules(&self) -> &'static [FieldRule] {
        self.rules
    }

    /// Names of the categorical fields, in rule order.
    pub fn categorical_fields(&self) -> impl Iterator<Item = &'static str> {
        self.rules.iter().filter(|r| r.is_categorical()).map(|r| r.name)
    }

    /// Validate a request body that may not even be an object.
    pub fn validate_value(&self, raw: &Value) -> Result<ApplicantRecord, ValidationErrors> {
        match raw {
            Value::Object(map) => self.validate(map),
            _ => Err(ValidationErrors::single("body", "must be a JSON object")),
        }
    }

    /// Validate every rule against `raw`, collecting all violations.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<ApplicantRecord, ValidationErrors> {
        let mut numeric = BTreeMap::new();
        let mut categorical = BTreeMap::new();
        let mut errors = Vec::new();

        for rule in self.rules {
            let outcome = match raw.get(rule.name) {
                None | Some(Value::Null) => Err("field required".to_string()),
                Some(value) => check_rule(rule, value),
            };

            match outcome {
                Ok(Checked::Numeric(v)) => {
                    numeric.insert(rule.name.to_string(), v);
                }
                Ok(Checked::Categorical(s)) => {
                    categorical.insert(rule.name.to_string(), s);
                }
                Err(message) => errors.push(FieldError {
                    field: rule.name.to_string(),
                    message,
                }),
            }
        }

        if errors.is_empty() {
            Ok(ApplicantRecord::from_parts(numeric, categorical))
        } else {
            Err(ValidationErrors::new(errors))
        }
    }
}

enum Checked {
    Numeric(f64),
    Categorical(String),
}

fn check_rule(rule: &FieldRule, value: &Value) -> Result<Checked, String> {
    match rule.kind {
        FieldKind::Integer => {
            let v = as_number(value)?;
            if v.fract() != 0.0 {
                return Err(format!("must be a whole number, got {v}"));
            }
            check_bounds(rule, v).map(Checked::Numeric)
        }
        FieldKind::Number => {
            let v = as_number(value)?;
            check_bounds(rule, v).map(Checked::Numeric)
        }
        FieldKind::Province => {
            let raw = value.as_str().ok_or_else(|| "must be a string".to_string())?;
            let normalized = raw.trim().to_uppercase();
            if PROVINCES.contains(&normalized.as_str()) {
                Ok(Checked::Categorical(normalized))
            } else {
                Err(format!(
                    "invalid province '{raw}'; must be one of {}",
                    PROVINCES.join(", ")
                ))
            }
        }
        FieldKind::OneOf(allowed) => {
            let raw = value.as_str().ok_or_else(|| "must be a string".to_string())?;
            if allowed.contains(&raw) {
                Ok(Checked::Categorical(raw.to_string()))
            } else {
                Err(format!("invalid value '{raw}'; must be one of {}", allowed.join(", ")))
            }
        }
    }
}

fn as_number(value: &Value) -> Result<f64, String> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err("must be a number".to_string()),
    }
}

fn check_bounds(rule: &FieldRule, v: f64) -> Result<f64, String> {
    if let Some(min) = rule.min {
        if v < min {
            return Err(format!("must be greater than or equal to {min}, got {v}"));
        }
    }
    if let Some(max) = rule.max {
        if v > max {
            return Err(format!("must be less than or equal to {max}, got {v}"));
        }
    }
    Ok(v)
}
