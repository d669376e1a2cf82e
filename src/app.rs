//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initialises logging
//! - resolves configuration (flags, then `.env` / environment, then defaults)
//! - loads the trained artifact once
//! - dispatches to serving, local prediction, batch scoring or inspection

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::cli::{ArtifactArgs, BatchArgs, Command, InspectArgs, PredictArgs, RemoteArgs, ServeArgs};
use crate::domain::ServeConfig;
use crate::error::{AppError, PredictError};

pub mod pipeline;

pub use pipeline::PredictionService;

/// Listen address when neither `--bind` nor `CREDIT_BIND` is set.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Entry point for the `credit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Serve(args) => handle_serve(args),
        Command::Predict(args) => handle_predict(args),
        Command::Batch(args) => handle_batch(args),
        Command::Inspect(args) => handle_inspect(args),
        Command::Remote(args) => handle_remote(args),
    }
}

/// Must run after `.env` is loaded so `RUST_LOG` from the file applies.
fn init_tracing(verbose: bool) {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, env_var))
        .with_writer(std::io::stderr)
        .init();
}

fn log_filter(verbose: bool, env: impl Fn(&str) -> Option<String>) -> EnvFilter {
    let default_filter = if verbose { "debug" } else { "info" };
    env("RUST_LOG")
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_artifact(args: &ArtifactArgs, env: impl Fn(&str) -> Option<String>) -> Result<PathBuf, AppError> {
    args.artifact
        .clone()
        .or_else(|| env("CREDIT_ARTIFACT").map(PathBuf::from))
        .ok_or_else(|| AppError::new(2, "No artifact given (use --artifact or set CREDIT_ARTIFACT)."))
}

/// Resolve serve configuration from flags, then the environment, then defaults.
pub fn serve_config_from_args(
    args: &ServeArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ServeConfig, AppError> {
    let artifact = resolve_artifact(&args.artifact, &env)?;

    let bind = match args.bind {
        Some(addr) => addr,
        None => {
            let raw = env("CREDIT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
            raw.parse::<SocketAddr>()
                .map_err(|e| AppError::new(2, format!("Invalid bind address '{raw}': {e}")))?
        }
    };

    let cors_origins = if args.cors_origins.is_empty() {
        env("CREDIT_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    } else {
        args.cors_origins.clone()
    };

    Ok(ServeConfig {
        artifact,
        bind,
        cors_origins,
        unseen_category: args.artifact.unseen_category,
    })
}

fn load_service(args: &ArtifactArgs) -> Result<PredictionService, AppError> {
    let path = resolve_artifact(args, env_var)?;
    PredictionService::load(&path, args.unseen_category)
}

fn handle_serve(args: ServeArgs) -> Result<(), AppError> {
    let config = serve_config_from_args(&args, env_var)?;
    let service = Arc::new(PredictionService::load(&config.artifact, config.unseen_category)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start async runtime: {e}")))?;
    runtime.block_on(crate::server::serve(service, config.bind, &config.cors_origins))
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let service = load_service(&args.artifact)?;
    let applicant = read_json_input(&args.input)?;

    let result = service.predict_value(&applicant).map_err(|e| match e {
        PredictError::Validation(errors) => {
            let lines: Vec<String> = errors
                .errors()
                .iter()
                .map(|f| format!("  {}: {}", f.field, f.message))
                .collect();
            AppError::new(2, format!("Validation failed:\n{}", lines.join("\n")))
        }
        other if other.is_client_error() => AppError::new(2, other.to_string()),
        other => AppError::new(4, format!("Prediction failed: {other}")),
    })?;

    println!("{}", to_json(&result, args.pretty)?);
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let service = load_service(&args.artifact)?;
    let summary = crate::io::batch::run_batch(&service, &args.input, args.output.as_deref())?;

    eprint!("{}", crate::report::format_batch_summary(&summary));
    if summary.scored == 0 {
        return Err(AppError::new(3, "No applicant could be scored."));
    }
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let path = resolve_artifact(&args.artifact, env_var)?;
    let service = PredictionService::load(&path, args.artifact.unseen_category)?;
    print!(
        "{}",
        crate::report::format_artifact_summary(&path, service.artifact())
    );
    Ok(())
}

fn handle_remote(args: RemoteArgs) -> Result<(), AppError> {
    let applicant = read_json_input(&args.input)?;
    let client = crate::data::RemoteClient::from_env(args.url);
    let response = client.predict(&applicant)?;
    println!("{}", to_json(&response.body, true)?);
    Ok(())
}

/// Read a JSON document from a file, or from stdin when `path` is `-`.
fn read_json_input(path: &Path) -> Result<Value, AppError> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::new(2, format!("Failed to read stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", path.display())))?
    };
    serde_json::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Invalid JSON in '{}': {e}", path.display())))
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, AppError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    out.map_err(|e| AppError::new(4, format!("Failed to serialize output: {e}")))
}
