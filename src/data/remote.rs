//! Blocking client for a running prediction service.

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::AppError;

/// Default endpoint when neither `--url` nor `CREDIT_API_URL` is set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/predict";

/// Response of a remote call: status plus decoded JSON body.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Value,
}

pub struct RemoteClient {
    client: Client,
    url: String,
}

impl RemoteClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Use `url` if given, else `CREDIT_API_URL` (`.env` honored), else the default.
    pub fn from_env(url: Option<String>) -> Self {
        dotenvy::dotenv().ok();
        let url = url
            .or_else(|| std::env::var("CREDIT_API_URL").ok())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one applicant; non-2xx responses are errors carrying status and body.
    pub fn predict(&self, applicant: &Value) -> Result<RemoteResponse, AppError> {
        let resp = self
            .client
            .post(&self.url)
            .json(applicant)
            .send()
            .map_err(|e| AppError::new(4, format!("Request to {} failed: {e}", self.url)))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| AppError::new(4, format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(AppError::new(
                4,
                format!("Prediction request failed with status {status}: {text}"),
            ));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| AppError::new(4, format!("Failed to parse response: {e}")))?;
        Ok(RemoteResponse {
            status: status.as_u16(),
            body,
        })
    }
}
