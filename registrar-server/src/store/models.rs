//! Data models for account storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use registrar_core::codes_match;

use crate::error::RegistrarError;

/// Unique account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    /// Lenient parse: `admin` is admin, everything else (including the
    /// Spanish synonyms and legacy `user`) is a student
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "student" | "alumno" | "estudiante" | "user" | "usuario" | "" => Role::Student,
            other => {
                tracing::debug!(role = %other, "Unknown role, treating as student");
                Role::Student
            }
        }
    }
}

/// An outstanding verification challenge
///
/// Code and expiry only ever exist together, so an account either has a
/// whole challenge or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// Wrong codes submitted against this challenge
    pub failed_attempts: u32,
}

impl Challenge {
    pub fn new(code: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            code,
            expires_at,
            failed_attempts: 0,
        }
    }

    /// A challenge is dead at or after its expiry instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A registered (pending or verified) account
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    /// Normalized (trimmed, lowercased) email
    pub email: String,
    pub full_name: String,
    /// Normalized carnet as entered
    pub carnet_number: String,
    /// Carnet uniqueness key (uppercase, no hyphens)
    pub carnet_key: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub challenge: Option<Challenge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Check a submitted code and apply the outcome to this account
    ///
    /// On success the account is promoted and the challenge cleared. A wrong
    /// code counts against the challenge, which is dropped once
    /// `max_attempts` is reached. Stores call this while holding whatever
    /// makes their read-modify-write atomic and persist the account whether
    /// or not it returns an error.
    pub fn apply_verification(
        &mut self,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<(), RegistrarError> {
        if self.is_verified {
            return Err(RegistrarError::AlreadyVerified);
        }

        let challenge = self
            .challenge
            .as_mut()
            .ok_or(RegistrarError::ChallengeExpired)?;

        if challenge.is_expired(now) {
            return Err(RegistrarError::ChallengeExpired);
        }

        if !codes_match(code, &challenge.code) {
            challenge.failed_attempts += 1;
            self.updated_at = now;

            if challenge.failed_attempts >= max_attempts {
                self.challenge = None;
                return Err(RegistrarError::TooManyAttempts);
            }

            return Err(RegistrarError::CodeMismatch {
                attempts_remaining: max_attempts - challenge.failed_attempts,
            });
        }

        self.is_verified = true;
        self.challenge = None;
        self.updated_at = now;
        Ok(())
    }
}

/// Fields written by a registration attempt
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub email: String,
    pub full_name: String,
    pub carnet_number: String,
    pub carnet_key: String,
    pub password_hash: String,
    pub challenge: Challenge,
}

/// Result of a conditional upsert
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub account: Account,
    /// `false` when an existing pending account was overwritten
    pub created: bool,
}

/// Account fields safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            role: account.role,
            is_verified: account.is_verified,
        }
    }
}
