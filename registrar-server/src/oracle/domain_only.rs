//! Oracle used when no deliverability service is configured

use registrar_core::DeliverabilityStatus;

use super::{DeliverabilityOracle, DeliverabilityReport, OracleError};

/// Reports every address as deliverable
///
/// Registration is then gated by the institutional domain check alone.
pub struct DomainOnlyOracle;

impl DomainOnlyOracle {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DomainOnlyOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliverabilityOracle for DomainOnlyOracle {
    fn check(&self, email: &str) -> Result<DeliverabilityReport, OracleError> {
        tracing::debug!(email = %email, "Skipping deliverability check (domain-only policy)");
        Ok(DeliverabilityReport {
            status: DeliverabilityStatus::Valid,
            sub_status: Some("domain-only".into()),
        })
    }
}
