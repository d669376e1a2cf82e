//! Error types.
//!
//! Two layers live here:
//!
//! - `AppError`: process-level failures (CLI surface) carrying an exit code
//! - `PredictError` / `LoadError`: typed failures of the serving pipeline and of
//!   the one-time artifact load
//!
//! Exit codes follow one convention across the binary:
//! - 2: bad configuration, input file or artifact
//! - 3: nothing usable to report (e.g. every batch row failed)
//! - 4: runtime failure (bind, remote call, I/O while writing results)

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(2, err.to_string())
    }
}

/// One violated constraint on one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All constraint violations found in a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Single-violation shorthand.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of the offending fields, in the order they were checked.
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Failure of a single prediction request.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The request violated the field contract. Resolved before the pipeline runs.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A categorical value has no training-time encoding.
    #[error("unsupported category for '{column}': {value:?}")]
    Codec { column: String, value: String },

    /// Alignment needed a training-time median but no snapshot was loaded.
    #[error("no default for column '{column}' and no training snapshot is loaded")]
    DataUnavailable { column: String },

    /// Anything else that went wrong inside encode/align/impute/scale/predict.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Short machine-readable label (used in logs and batch exports).
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation_error",
            PredictError::Codec { .. } => "codec_error",
            PredictError::DataUnavailable { .. } => "data_unavailable",
            PredictError::Inference(_) => "inference_error",
        }
    }

    /// Whether the failure is attributable to the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Validation(_) | PredictError::Codec { .. })
    }
}

impl From<ValidationErrors> for PredictError {
    fn from(err: ValidationErrors) -> Self {
        PredictError::Validation(err)
    }
}

/// Failure to load the trained artifact at startup. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read artifact '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported artifact format version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("artifact is missing required component: {0}")]
    Missing(String),

    #[error("artifact is inconsistent: {0}")]
    Inconsistent(String),
}
