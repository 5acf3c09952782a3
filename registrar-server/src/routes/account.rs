//! Registration endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::run_blocking;
use crate::email::EmailSender;
use crate::error::RegistrarError;
use crate::oracle::DeliverabilityOracle;
use crate::registrar::{Delivery, RegistrationRequest};
use crate::state::AppState;
use crate::store::{AccountStore, AccountView};

const UNDELIVERED_WARNING: &str =
    "We could not send the verification email. Request a new code to try again";

fn delivery_fields(delivery: &Delivery) -> (bool, Option<String>) {
    match delivery {
        Delivery::Sent => (true, None),
        Delivery::Failed(_) => (false, Some(UNDELIVERED_WARNING.to_string())),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub requires_verification: bool,
    pub code_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub user: AccountView,
}

/// POST /api/auth/register
/// Stage a pending account and send its verification code
pub async fn register<U, D, E>(
    State(state): State<Arc<AppState<U, D, E>>>,
    Json(req): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), RegistrarError>
where
    U: AccountStore + 'static,
    D: DeliverabilityOracle + 'static,
    E: EmailSender + 'static,
{
    let registration = run_blocking(move || state.registrar.register(req)).await?;
    let (code_sent, warning) = delivery_fields(&registration.delivery);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration received. Check your institutional email for the verification code".into(),
            requires_verification: true,
            code_sent,
            warning,
            user: registration.account,
        }),
    ))
}

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendCodeResponse {
    pub success: bool,
    pub code_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// POST /api/auth/resend-code
/// Issue a fresh verification code for a pending account
pub async fn resend_code<U, D, E>(
    State(state): State<Arc<AppState<U, D, E>>>,
    Json(req): Json<ResendCodeRequest>,
) -> Result<Json<ResendCodeResponse>, RegistrarError>
where
    U: AccountStore + 'static,
    D: DeliverabilityOracle + 'static,
    E: EmailSender + 'static,
{
    let delivery = run_blocking(move || state.registrar.resend_code(&req.email)).await?;
    let (code_sent, warning) = delivery_fields(&delivery);

    Ok(Json(ResendCodeResponse {
        success: true,
        code_sent,
        warning,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCarnetRequest {
    #[serde(default)]
    pub carnet_number: String,
}

#[derive(Serialize)]
pub struct ValidateCarnetResponse {
    pub valid: bool,
    pub available: bool,
    pub message: String,
}

/// POST /api/auth/validate-carnet
/// Check carnet format and availability
pub async fn validate_carnet<U, D, E>(
    State(state): State<Arc<AppState<U, D, E>>>,
    Json(req): Json<ValidateCarnetRequest>,
) -> Result<Json<ValidateCarnetResponse>, RegistrarError>
where
    U: AccountStore + 'static,
    D: DeliverabilityOracle + 'static,
    E: EmailSender + 'static,
{
    let result =
        run_blocking(move || state.registrar.validate_carnet(&req.carnet_number)).await?;

    Ok(Json(ValidateCarnetResponse {
        valid: result.valid,
        available: result.available,
        message: result.message,
    }))
}
