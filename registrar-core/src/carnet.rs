//! Carnet (student id) handling
//!
//! Accepted formats: `DDDD-DD-DDDD` or `DDDD-DD-DDDDD`.
//! Uniqueness is checked on a key that ignores case and hyphens,
//! so `0904-22-12345` and `090422-12345` collide.

use crate::{Error, Result};

/// A carnet number as supplied by the applicant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carnet {
    normalized: String,
}

impl Carnet {
    /// Normalize without validating the format (trim + uppercase)
    pub fn new(raw: &str) -> Self {
        Self {
            normalized: raw.trim().to_uppercase(),
        }
    }

    /// Normalize and require one of the accepted formats
    pub fn parse(raw: &str) -> Result<Self> {
        let carnet = Self::new(raw);
        carnet.validate_format()?;
        Ok(carnet)
    }

    /// Check the normalized value against the accepted formats
    pub fn validate_format(&self) -> Result<()> {
        let parts: Vec<&str> = self.normalized.split('-').collect();

        let valid = match parts.as_slice() {
            [campus, year, serial] => {
                is_digits(campus, 4) && is_digits(year, 2) && (is_digits(serial, 4) || is_digits(serial, 5))
            }
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(Error::InvalidCarnet(
                "use 0000-00-0000 or 0000-00-00000".into(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Canonical key for uniqueness checks
    pub fn key(&self) -> String {
        self.normalized.replace('-', "")
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}
