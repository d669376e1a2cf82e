//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the validated applicant (`ApplicantRecord`)
//! - variant and policy enums (`ServiceVariant`, `UnseenCategoryPolicy`, `MissingColumnPolicy`)
//! - response shapes (`PredictionResult`, `ApprovalDecision`, `LoanEligibility`)
//! - serve configuration (`ServeConfig`)

pub mod types;

pub use types::*;
