//! Storage abstractions for the registrar

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryAccountStore;
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::RegistrarError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, RegistrarError>;

/// Trait for account storage
///
/// Every mutating method is a single atomic operation: implementations must
/// not let another call for the same email interleave between the check and
/// the write.
pub trait AccountStore: Send + Sync {
    /// Get an account by normalized email
    fn get_account(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Whether a carnet key is free, ignoring the account owning `email`
    fn carnet_available(&self, carnet_key: &str, email: Option<&str>) -> StoreResult<bool>;

    /// Insert a pending account or overwrite the pending account with the
    /// same email
    ///
    /// Fails with `AlreadyRegistered` if the email belongs to a verified
    /// account and with `CarnetTaken` if another account holds the carnet.
    /// An overwrite keeps the account id and role and resets the attempt
    /// counter.
    fn upsert_pending(&self, registration: PendingRegistration) -> StoreResult<UpsertOutcome>;

    /// Replace the challenge of a pending account
    ///
    /// Fails with `AccountNotFound` or `AlreadyVerified`.
    fn replace_challenge(&self, email: &str, challenge: Challenge) -> StoreResult<Account>;

    /// Check a code and promote the account, as one operation
    ///
    /// See [`Account::apply_verification`] for the outcomes. Attempt
    /// bookkeeping is persisted even when the check fails.
    fn verify_account(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> StoreResult<Account>;
}

/// Allow using Box<dyn AccountStore> as an AccountStore
impl AccountStore for Box<dyn AccountStore> {
    fn get_account(&self, email: &str) -> StoreResult<Option<Account>> {
        (**self).get_account(email)
    }

    fn carnet_available(&self, carnet_key: &str, email: Option<&str>) -> StoreResult<bool> {
        (**self).carnet_available(carnet_key, email)
    }

    fn upsert_pending(&self, registration: PendingRegistration) -> StoreResult<UpsertOutcome> {
        (**self).upsert_pending(registration)
    }

    fn replace_challenge(&self, email: &str, challenge: Challenge) -> StoreResult<Account> {
        (**self).replace_challenge(email, challenge)
    }

    fn verify_account(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> StoreResult<Account> {
        (**self).verify_account(email, code, now, max_attempts)
    }
}
