//! Reporting utilities: response shaping and terminal summaries.

pub mod format;

pub use format::*;
