//! Error types for registrar primitives

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Email domain {actual} is not the institutional domain {expected}")]
    NonInstitutionalDomain { expected: String, actual: String },

    #[error("Invalid institutional domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid carnet format: {0}")]
    InvalidCarnet(String),
}
