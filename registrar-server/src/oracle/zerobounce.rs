//! ZeroBounce email validation client
//!
//! Calls `GET <api_url>?api_key=..&email=..&ip_address=` and reads the
//! `status` / `sub_status` fields of the JSON reply. ZeroBounce answers
//! credential and quota problems with HTTP 200 and an `error` field.

use reqwest::blocking::Client;
use serde::Deserialize;

use registrar_core::DeliverabilityStatus;

use super::{DeliverabilityOracle, DeliverabilityReport, OracleError};
use crate::config::ZeroBounceConfig;

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    status: Option<String>,
    sub_status: Option<String>,
    error: Option<String>,
}

/// Blocking ZeroBounce client
///
/// A fresh `reqwest::blocking::Client` is built per check, so `check` must be
/// called from a blocking context (e.g. `tokio::task::spawn_blocking`).
pub struct ZeroBounceOracle {
    config: ZeroBounceConfig,
}

impl ZeroBounceOracle {
    pub fn new(config: ZeroBounceConfig) -> Self {
        Self { config }
    }

    fn client(&self) -> Result<Client, OracleError> {
        Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| OracleError::Transport(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Interpret a ZeroBounce response body
pub fn parse_response(body: &str) -> Result<DeliverabilityReport, OracleError> {
    let response: ValidateResponse =
        serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))?;

    if let Some(error) = response.error.filter(|e| !e.trim().is_empty()) {
        return Err(OracleError::Api(error));
    }

    let status = response
        .status
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| OracleError::Malformed("missing status".into()))?;

    Ok(DeliverabilityReport {
        status: DeliverabilityStatus::parse(&status),
        sub_status: response.sub_status.filter(|s| !s.trim().is_empty()),
    })
}

impl DeliverabilityOracle for ZeroBounceOracle {
    fn check(&self, email: &str) -> Result<DeliverabilityReport, OracleError> {
        let client = self.client()?;

        let response = client
            .get(&self.config.api_url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("email", email),
                ("ip_address", ""),
            ])
            .send()
            // The URL carries the API key; keep it out of error messages
            .map_err(|e| OracleError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| OracleError::Transport(e.without_url().to_string()))?;

        let report = parse_response(&body)?;
        tracing::debug!(email = %email, status = %report.status, "Deliverability check complete");
        Ok(report)
    }
}
