//! Command-line parsing for the credit-approval service.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! command dispatch (`app`) and from the pipeline itself.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::UnseenCategoryPolicy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "credit", version, about = "Credit approval prediction service")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve predictions over HTTP.
    Serve(ServeArgs),
    /// Score one applicant JSON document locally and print the response.
    Predict(PredictArgs),
    /// Score a CSV of applicants and write a results CSV.
    Batch(BatchArgs),
    /// Print a summary of a trained artifact.
    Inspect(InspectArgs),
    /// Send one applicant to a running service.
    Remote(RemoteArgs),
}

/// Artifact selection shared by every local command.
#[derive(Debug, Args, Clone)]
pub struct ArtifactArgs {
    /// Trained artifact JSON (falls back to CREDIT_ARTIFACT).
    #[arg(short, long)]
    pub artifact: Option<PathBuf>,

    /// Override the artifact's policy for categories unseen during training.
    #[arg(long, value_enum)]
    pub unseen_category: Option<UnseenCategoryPolicy>,
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Listen address (falls back to CREDIT_BIND, then 127.0.0.1:8000).
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Allowed CORS origin; repeat for several (falls back to CREDIT_CORS_ORIGINS).
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Applicant JSON file, or `-` for stdin.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Pretty-print the response.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Applicants CSV (headers are request field names).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Results CSV; stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,
}

#[derive(Debug, Args, Clone)]
pub struct RemoteArgs {
    /// Applicant JSON file, or `-` for stdin.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Service endpoint (falls back to CREDIT_API_URL).
    #[arg(long)]
    pub url: Option<String>,
}
