//! Email verification endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::run_blocking;
use crate::email::EmailSender;
use crate::error::RegistrarError;
use crate::oracle::DeliverabilityOracle;
use crate::state::AppState;
use crate::store::{AccountStore, AccountView};

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub user: AccountView,
}

/// POST /api/auth/verify
/// Activate an account with its verification code
pub async fn verify<U, D, E>(
    State(state): State<Arc<AppState<U, D, E>>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, RegistrarError>
where
    U: AccountStore + 'static,
    D: DeliverabilityOracle + 'static,
    E: EmailSender + 'static,
{
    let user = run_blocking(move || state.registrar.verify(&req.email, &req.code)).await?;

    Ok(Json(VerifyResponse {
        success: true,
        message: "Email verified. You can now log in".into(),
        user,
    }))
}
