//! Registrar error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use registrar_core::DeliverabilityStatus;

/// Stable classification of a failure, exposed to clients as `error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    PolicyRejection,
    Conflict,
    Upstream,
    NotFound,
    Expired,
    CodeMismatch,
    TooManyAttempts,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::PolicyRejection | ErrorKind::CodeMismatch => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Expired => StatusCode::GONE,
            ErrorKind::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("All fields are required")]
    MissingFields,

    #[error("You must use an institutional email address ({domain})")]
    NonInstitutionalEmail { domain: String },

    #[error("Invalid carnet format: {0}")]
    InvalidCarnet(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("We could not confirm that this email address exists")]
    Undeliverable { status: DeliverabilityStatus },

    #[error("This email is already registered. Log in or recover your account")]
    AlreadyRegistered,

    #[error("This carnet is already registered")]
    CarnetTaken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account is already verified")]
    AlreadyVerified,

    #[error("Verification code expired. Request a new code")]
    ChallengeExpired,

    #[error("Invalid verification code")]
    CodeMismatch { attempts_remaining: u32 },

    #[error("Too many failed attempts. Request a new code")]
    TooManyAttempts,

    #[error("Email verification service unavailable: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistrarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistrarError::MissingFields
            | RegistrarError::NonInstitutionalEmail { .. }
            | RegistrarError::InvalidCarnet(_)
            | RegistrarError::ValidationError(_) => ErrorKind::Validation,
            RegistrarError::Undeliverable { .. } => ErrorKind::PolicyRejection,
            RegistrarError::AlreadyRegistered
            | RegistrarError::CarnetTaken
            | RegistrarError::AlreadyVerified => ErrorKind::Conflict,
            RegistrarError::AccountNotFound => ErrorKind::NotFound,
            RegistrarError::ChallengeExpired => ErrorKind::Expired,
            RegistrarError::CodeMismatch { .. } => ErrorKind::CodeMismatch,
            RegistrarError::TooManyAttempts => ErrorKind::TooManyAttempts,
            RegistrarError::Upstream(_) => ErrorKind::Upstream,
            RegistrarError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<registrar_core::Error> for RegistrarError {
    fn from(err: registrar_core::Error) -> Self {
        use registrar_core::Error as CoreError;

        match err {
            CoreError::NonInstitutionalDomain { expected, .. } => {
                RegistrarError::NonInstitutionalEmail {
                    domain: format!("@{}", expected),
                }
            }
            CoreError::InvalidCarnet(msg) => RegistrarError::InvalidCarnet(msg),
            CoreError::InvalidEmail(_) => {
                RegistrarError::ValidationError("Invalid email address".into())
            }
            CoreError::InvalidDomain(msg) => RegistrarError::Internal(msg),
        }
    }
}

impl IntoResponse for RegistrarError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let (reason, details) = match &self {
            RegistrarError::Undeliverable { status } => {
                tracing::warn!(%status, "Deliverability check rejected address");
                (self.to_string(), Some(json!({ "status": status })))
            }
            RegistrarError::CodeMismatch { attempts_remaining } => (
                self.to_string(),
                Some(json!({ "attemptsRemaining": attempts_remaining })),
            ),
            RegistrarError::Upstream(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (
                    "Could not validate the institutional email address. Try again later".into(),
                    Some(json!({ "upstream": msg })),
                )
            }
            RegistrarError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".into(), None)
            }
            _ => (self.to_string(), None),
        };

        let mut body = json!({ "success": false, "error": kind, "reason": reason });
        if let Some(details) = details {
            body["details"] = details;
        }

        (kind.status_code(), axum::Json(body)).into_response()
    }
}
