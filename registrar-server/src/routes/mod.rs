//! HTTP routes for the registrar

mod account;
mod verify;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::error::RegistrarError;
use crate::oracle::DeliverabilityOracle;
use crate::state::AppState;
use crate::store::AccountStore;

/// Create the router with all routes
pub fn create_router<U, D, E>(state: Arc<AppState<U, D, E>>) -> Router
where
    U: AccountStore + 'static,
    D: DeliverabilityOracle + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/api/auth/register", post(account::register))
        .route("/api/auth/resend-code", post(account::resend_code))
        .route("/api/auth/validate-carnet", post(account::validate_carnet))
        .route("/api/auth/verify", post(verify::verify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run registrar work off the async executor
///
/// Store, oracle and SMTP calls all block. The closure runs to completion
/// even if the client disconnects, so a started write is never abandoned
/// halfway.
async fn run_blocking<T, F>(f: F) -> Result<T, RegistrarError>
where
    F: FnOnce() -> Result<T, RegistrarError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RegistrarError::Internal(format!("Blocking task failed: {}", e)))?
}
