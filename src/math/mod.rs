//! Numeric preprocessing: persisted median imputation and standardization.

pub mod preprocess;

pub use preprocess::*;
