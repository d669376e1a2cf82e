//! Input/output helpers.
//!
//! - request validation (`applicant`)
//! - trained-artifact loading (`artifact`)
//! - batch CSV scoring (`batch`)

pub mod applicant;
pub mod artifact;
pub mod batch;

pub use applicant::*;
pub use artifact::*;
pub use batch::*;
