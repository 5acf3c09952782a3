//! Registrar Core Library
//!
//! Validation primitives for institutional account registration:
//! - Email addresses are normalized and checked against the institutional domain
//! - Carnet (student id) numbers are normalized, format-checked and keyed for uniqueness
//! - Verification codes are generated and compared in constant time
//! - Mailbox deliverability statuses are normalized for allow-list checks

pub mod carnet;
pub mod code;
pub mod deliverability;
pub mod email;
pub mod error;

pub use carnet::Carnet;
pub use code::{codes_match, generate_verification_code, VERIFICATION_CODE_LENGTH};
pub use deliverability::DeliverabilityStatus;
pub use email::{normalize_email, InstitutionalDomain};
pub use error::Error;

/// Result type for registrar-core operations
pub type Result<T> = std::result::Result<T, Error>;
