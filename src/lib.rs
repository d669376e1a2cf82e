//! `credit-approval` library crate.
//!
//! The binary (`credit`) is a thin wrapper around this library so that:
//!
//! - the prediction pipeline is testable without spawning processes or sockets
//! - the HTTP layer, batch scoring and one-shot CLI share one `PredictionService`
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;
