//! External data access: calling a running prediction service over HTTP.

pub mod remote;

pub use remote::*;
