//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{
    Account, AccountId, AccountStore, Challenge, PendingRegistration, Role, StoreResult,
    UpsertOutcome,
};
use crate::error::RegistrarError;

/// In-memory account store
///
/// All accounts live behind one lock; holding the write guard for the whole
/// check-then-write makes each mutating call atomic.
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
    next_account_id: AtomicU64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            next_account_id: AtomicU64::new(1),
        }
    }

    /// Number of stored accounts (for testing purposes)
    pub fn len(&self) -> usize {
        self.read().map(|accounts| accounts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the challenge expiry for an email (for testing purposes)
    pub fn set_code_expires_at(&self, email: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut accounts = self.write()?;
        let challenge = accounts
            .get_mut(email)
            .ok_or(RegistrarError::AccountNotFound)?
            .challenge
            .as_mut()
            .ok_or(RegistrarError::ChallengeExpired)?;
        challenge.expires_at = expires_at;
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Account>>> {
        self.accounts
            .read()
            .map_err(|e| RegistrarError::Internal(format!("Account store lock poisoned: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Account>>> {
        self.accounts
            .write()
            .map_err(|e| RegistrarError::Internal(format!("Account store lock poisoned: {}", e)))
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn carnet_held_by_other(
    accounts: &HashMap<String, Account>,
    carnet_key: &str,
    email: Option<&str>,
) -> bool {
    accounts
        .values()
        .any(|a| a.carnet_key == carnet_key && Some(a.email.as_str()) != email)
}

impl AccountStore for InMemoryAccountStore {
    fn get_account(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(self.read()?.get(email).cloned())
    }

    fn carnet_available(&self, carnet_key: &str, email: Option<&str>) -> StoreResult<bool> {
        let accounts = self.read()?;
        Ok(!carnet_held_by_other(&accounts, carnet_key, email))
    }

    fn upsert_pending(&self, registration: PendingRegistration) -> StoreResult<UpsertOutcome> {
        let mut accounts = self.write()?;
        let now = Utc::now();

        if carnet_held_by_other(&accounts, &registration.carnet_key, Some(&registration.email)) {
            return Err(RegistrarError::CarnetTaken);
        }

        if let Some(existing) = accounts.get_mut(&registration.email) {
            if existing.is_verified {
                return Err(RegistrarError::AlreadyRegistered);
            }

            existing.full_name = registration.full_name;
            existing.carnet_number = registration.carnet_number;
            existing.carnet_key = registration.carnet_key;
            existing.password_hash = registration.password_hash;
            existing.challenge = Some(registration.challenge);
            existing.updated_at = now;

            return Ok(UpsertOutcome {
                account: existing.clone(),
                created: false,
            });
        }

        let account = Account {
            id: AccountId(self.next_account_id.fetch_add(1, Ordering::SeqCst)),
            email: registration.email.clone(),
            full_name: registration.full_name,
            carnet_number: registration.carnet_number,
            carnet_key: registration.carnet_key,
            password_hash: registration.password_hash,
            role: Role::default(),
            is_verified: false,
            challenge: Some(registration.challenge),
            created_at: now,
            updated_at: now,
        };
        accounts.insert(registration.email, account.clone());

        Ok(UpsertOutcome {
            account,
            created: true,
        })
    }

    fn replace_challenge(&self, email: &str, challenge: Challenge) -> StoreResult<Account> {
        let mut accounts = self.write()?;
        let account = accounts
            .get_mut(email)
            .ok_or(RegistrarError::AccountNotFound)?;

        if account.is_verified {
            return Err(RegistrarError::AlreadyVerified);
        }

        account.challenge = Some(challenge);
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    fn verify_account(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> StoreResult<Account> {
        let mut accounts = self.write()?;
        let account = accounts
            .get_mut(email)
            .ok_or(RegistrarError::AccountNotFound)?;

        account.apply_verification(code, now, max_attempts)?;
        Ok(account.clone())
    }
}
