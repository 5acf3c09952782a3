//! Email normalization and institutional domain matching

use std::fmt;

use crate::{Error, Result};

/// Normalize an email address for storage and lookup (trim + lowercase)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The organization's registered email domain (e.g. `miumg.edu.gt`)
///
/// Only addresses whose domain equals this value, compared case-insensitively,
/// are eligible for registration. Subdomains do not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionalDomain(String);

impl InstitutionalDomain {
    /// Parse a domain, accepting an optional leading `@`
    pub fn parse(domain: &str) -> Result<Self> {
        let domain = domain.trim().trim_start_matches('@').to_lowercase();

        if domain.is_empty() {
            return Err(Error::InvalidDomain("domain is empty".into()));
        }
        if domain.contains('@') || domain.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDomain(domain));
        }
        if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
            return Err(Error::InvalidDomain(domain));
        }

        Ok(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that an address belongs to this domain
    ///
    /// Returns the normalized address on success. The address must have a
    /// non-empty local part and its domain (after the last `@`) must equal
    /// the institutional domain exactly.
    pub fn check(&self, email: &str) -> Result<String> {
        let normalized = normalize_email(email);

        let (local, domain) = normalized
            .rsplit_once('@')
            .ok_or_else(|| Error::InvalidEmail(normalized.clone()))?;

        if local.is_empty() || local.chars().any(char::is_whitespace) {
            return Err(Error::InvalidEmail(normalized.clone()));
        }

        if domain != self.0 {
            return Err(Error::NonInstitutionalDomain {
                expected: self.0.clone(),
                actual: domain.to_string(),
            });
        }

        Ok(normalized)
    }

    pub fn is_institutional(&self, email: &str) -> bool {
        self.check(email).is_ok()
    }
}

impl fmt::Display for InstitutionalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
