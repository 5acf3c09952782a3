//! Registration orchestrator and verification handler
//!
//! `register` runs its gates in a fixed order and stops at the first failure:
//!
//! 1. required fields, institutional domain, carnet format if enforced (no I/O)
//! 2. existing-account lookup: a verified email is a conflict
//! 3. carnet pre-check against other accounts
//! 4. deliverability oracle
//! 5. password hash, fresh challenge
//! 6. one conditional upsert
//! 7. code dispatch (failure is reported, not raised)

use chrono::{DateTime, Utc};
use serde::Deserialize;

use registrar_core::{generate_verification_code, normalize_email, Carnet};

use crate::config::RegistrationPolicy;
use crate::crypto::PasswordHasher;
use crate::email::EmailSender;
use crate::error::RegistrarError;
use crate::oracle::DeliverabilityOracle;
use crate::store::{AccountStore, AccountView, Challenge, PendingRegistration};

/// Applicant-supplied registration data
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub carnet_number: String,
}

/// Whether the verification code reached the mail system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed(String),
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent)
    }
}

/// Successful registration attempt
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: AccountView,
    /// `false` when an existing pending account was overwritten
    pub created: bool,
    pub delivery: Delivery,
}

/// Result of `validate_carnet`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarnetAvailability {
    pub valid: bool,
    pub available: bool,
    pub message: String,
}

/// Coordinates the account store, deliverability oracle and email sender
pub struct Registrar<U, D, E>
where
    U: AccountStore,
    D: DeliverabilityOracle,
    E: EmailSender,
{
    store: U,
    oracle: D,
    email_sender: E,
    hasher: PasswordHasher,
    policy: RegistrationPolicy,
}

impl<U, D, E> Registrar<U, D, E>
where
    U: AccountStore,
    D: DeliverabilityOracle,
    E: EmailSender,
{
    pub fn new(
        store: U,
        oracle: D,
        email_sender: E,
        hasher: PasswordHasher,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            store,
            oracle,
            email_sender,
            hasher,
            policy,
        }
    }

    pub fn store(&self) -> &U {
        &self.store
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Register an applicant, or refresh their pending registration
    pub fn register(&self, req: RegistrationRequest) -> Result<Registration, RegistrarError> {
        let full_name = req.full_name.trim();
        let carnet = Carnet::new(&req.carnet_number);

        if full_name.is_empty()
            || req.email.trim().is_empty()
            || req.password.is_empty()
            || carnet.is_empty()
        {
            return Err(RegistrarError::MissingFields);
        }

        let email = self.policy.institutional_domain.check(&req.email)?;

        if self.policy.require_carnet_format {
            carnet.validate_format()?;
        }

        if let Some(existing) = self.store.get_account(&email)? {
            if existing.is_verified {
                tracing::info!(email = %email, "Registration rejected: email already verified");
                return Err(RegistrarError::AlreadyRegistered);
            }
        }

        let carnet_key = carnet.key();
        if !self.store.carnet_available(&carnet_key, Some(&email))? {
            tracing::info!(email = %email, "Registration rejected: carnet already registered");
            return Err(RegistrarError::CarnetTaken);
        }

        let report = self.oracle.check(&email).map_err(|e| {
            tracing::error!(email = %email, error = %e, "Deliverability oracle failed");
            RegistrarError::Upstream(e.to_string())
        })?;

        if !self.policy.is_allowed(&report.status) {
            tracing::warn!(
                email = %email,
                status = %report.status,
                sub_status = ?report.sub_status,
                "Registration rejected: address not deliverable"
            );
            return Err(RegistrarError::Undeliverable {
                status: report.status,
            });
        }

        let password_hash = self
            .hasher
            .hash(&req.password)
            .map_err(|e| RegistrarError::Internal(e.to_string()))?;

        let code = generate_verification_code();
        let challenge = Challenge::new(code.clone(), self.code_expiry(Utc::now())?);

        let outcome = self.store.upsert_pending(PendingRegistration {
            email: email.clone(),
            full_name: full_name.to_string(),
            carnet_number: carnet.as_str().to_string(),
            carnet_key,
            password_hash,
            challenge,
        })?;

        tracing::info!(
            email = %email,
            account_id = outcome.account.id.0,
            created = outcome.created,
            "Pending account staged"
        );

        let delivery = self.dispatch(&email, full_name, &code);

        Ok(Registration {
            account: AccountView::from(&outcome.account),
            created: outcome.created,
            delivery,
        })
    }

    /// Check a verification code and activate the account
    pub fn verify(&self, email: &str, code: &str) -> Result<AccountView, RegistrarError> {
        self.verify_at(email, code, Utc::now())
    }

    /// [`verify`](Self::verify) against an explicit clock reading
    pub fn verify_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountView, RegistrarError> {
        if email.trim().is_empty() || code.trim().is_empty() {
            return Err(RegistrarError::ValidationError(
                "Email and code are required".into(),
            ));
        }

        let email = normalize_email(email);

        match self
            .store
            .verify_account(&email, code, now, self.policy.max_attempts)
        {
            Ok(account) => {
                tracing::info!(email = %email, account_id = account.id.0, "Account verified");
                Ok(AccountView::from(&account))
            }
            Err(e @ RegistrarError::TooManyAttempts) => {
                tracing::warn!(email = %email, "Verification challenge exhausted");
                Err(e)
            }
            Err(e) => {
                tracing::debug!(email = %email, error = %e, "Verification failed");
                Err(e)
            }
        }
    }

    /// Issue a fresh code for a pending account and send it
    ///
    /// The deliverability oracle is not consulted again; the address already
    /// passed it when the account was staged.
    pub fn resend_code(&self, email: &str) -> Result<Delivery, RegistrarError> {
        if email.trim().is_empty() {
            return Err(RegistrarError::ValidationError("Email is required".into()));
        }

        let email = normalize_email(email);
        let code = generate_verification_code();
        let challenge = Challenge::new(code.clone(), self.code_expiry(Utc::now())?);

        let account = self.store.replace_challenge(&email, challenge)?;
        tracing::info!(email = %email, account_id = account.id.0, "Verification code reissued");

        Ok(self.dispatch(&email, &account.full_name, &code))
    }

    /// Report whether a carnet would be accepted by `register` and is unclaimed
    ///
    /// The layout is only checked when the policy enforces it.
    pub fn validate_carnet(&self, carnet_number: &str) -> Result<CarnetAvailability, RegistrarError> {
        let carnet = Carnet::new(carnet_number);
        if carnet.is_empty() {
            return Err(RegistrarError::ValidationError("Carnet is required".into()));
        }

        if self.policy.require_carnet_format {
            if let Err(e) = carnet.validate_format() {
                return Ok(CarnetAvailability {
                    valid: false,
                    available: false,
                    message: e.to_string(),
                });
            }
        }

        if self.store.carnet_available(&carnet.key(), None)? {
            Ok(CarnetAvailability {
                valid: true,
                available: true,
                message: "Carnet available".into(),
            })
        } else {
            Ok(CarnetAvailability {
                valid: true,
                available: false,
                message: "This carnet is already registered".into(),
            })
        }
    }

    /// Expiry instant for a challenge issued at `now`
    fn code_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RegistrarError> {
        now.checked_add_signed(self.policy.code_ttl).ok_or_else(|| {
            RegistrarError::Internal(format!(
                "Code lifetime of {} minutes is out of range",
                self.policy.code_ttl.num_minutes()
            ))
        })
    }

    fn dispatch(&self, email: &str, full_name: &str, code: &str) -> Delivery {
        match self.email_sender.send_verification(email, full_name, code) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Verification email not delivered");
                Delivery::Failed(e)
            }
        }
    }
}
