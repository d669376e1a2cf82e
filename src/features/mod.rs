//! Feature preparation: categorical encoding and schema alignment.
//!
//! Responsibilities:
//!
//! - encode categorical applicant fields the way they were encoded at training time
//! - lay the encoded row out in the training schema's exact column order

pub mod aligner;
pub mod encoder;

pub use aligner::*;
pub use encoder::*;
