//! Mailbox deliverability oracles

pub mod domain_only;
pub mod zerobounce;

pub use domain_only::DomainOnlyOracle;
pub use zerobounce::ZeroBounceOracle;

use registrar_core::DeliverabilityStatus;
use serde::Serialize;
use thiserror::Error;

/// Normalized answer from a deliverability oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverabilityReport {
    pub status: DeliverabilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,
}

impl DeliverabilityReport {
    pub fn new(status: DeliverabilityStatus) -> Self {
        Self {
            status,
            sub_status: None,
        }
    }
}

/// Failure to obtain an answer from the oracle
///
/// Distinct from an answer the policy rejects. Messages never carry the
/// API key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("oracle reported an error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Trait for checking whether a mailbox accepts mail
pub trait DeliverabilityOracle: Send + Sync {
    fn check(&self, email: &str) -> Result<DeliverabilityReport, OracleError>;
}

/// Allow using Box<dyn DeliverabilityOracle> as a DeliverabilityOracle
impl DeliverabilityOracle for Box<dyn DeliverabilityOracle> {
    fn check(&self, email: &str) -> Result<DeliverabilityReport, OracleError> {
        (**self).check(email)
    }
}
