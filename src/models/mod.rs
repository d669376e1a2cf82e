//! Persisted estimators and the inference stage built from them.
//!
//! Estimators are plain data (deserialized once) with pure evaluation, so the
//! inference stage can stay generic over the `Estimator` trait.

pub mod estimator;
pub mod stage;
pub mod tree;

pub use estimator::*;
pub use stage::*;
pub use tree::*;
