//! Registrar Server
//!
//! Registration and email verification for institutional accounts:
//! applicants register with an institutional address, the address is checked
//! with a deliverability oracle, and a one-time code sent by email activates
//! the account.

pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod oracle;
pub mod registrar;
pub mod routes;
pub mod state;
pub mod store;

pub use config::{Config, RegistrationPolicy};
pub use crypto::PasswordHasher;
pub use email::{ConsoleEmailSender, EmailSender, SmtpConfig, SmtpEmailSender};
pub use error::{ErrorKind, RegistrarError};
pub use oracle::{DeliverabilityOracle, DeliverabilityReport, DomainOnlyOracle, OracleError, ZeroBounceOracle};
pub use registrar::{Delivery, Registrar, Registration, RegistrationRequest};
pub use state::AppState;
pub use store::{AccountStore, AccountView, InMemoryAccountStore, SqliteStore};
