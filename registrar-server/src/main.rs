//! Registrar Server
//!
//! Registration and email verification service for institutional student
//! accounts.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use registrar_server::{
    routes, AccountStore, AppState, Config, ConsoleEmailSender, DeliverabilityOracle,
    DomainOnlyOracle, EmailSender, InMemoryAccountStore, PasswordHasher, Registrar,
    SmtpEmailSender, SqliteStore, ZeroBounceOracle,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registrar_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let store: Box<dyn AccountStore> = match &config.database_path {
        Some(path) => {
            tracing::info!(path = %path, "Using SQLite account store");
            Box::new(SqliteStore::open(path)?)
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, accounts will not survive a restart");
            Box::new(InMemoryAccountStore::new())
        }
    };

    let oracle: Box<dyn DeliverabilityOracle> = match config.zerobounce.clone() {
        Some(zerobounce) => {
            tracing::info!(url = %zerobounce.api_url, "Using ZeroBounce deliverability oracle");
            Box::new(ZeroBounceOracle::new(zerobounce))
        }
        None => {
            tracing::warn!("ZEROBOUNCE_API_KEY not set, only the email domain will be checked");
            Box::new(DomainOnlyOracle::new())
        }
    };

    let email_sender: Box<dyn EmailSender> = match config.smtp.clone() {
        Some(smtp) => {
            let sender = tokio::task::spawn_blocking(move || SmtpEmailSender::new(smtp))
                .await?
                .map_err(anyhow::Error::msg)?;
            Box::new(sender)
        }
        None => {
            tracing::warn!("SMTP not configured, verification codes will be printed to the console");
            Box::new(ConsoleEmailSender::new())
        }
    };

    let registrar = Registrar::new(
        store,
        oracle,
        email_sender,
        PasswordHasher::new(config.bcrypt_cost),
        config.policy.clone(),
    );

    // Create app state
    let state = Arc::new(AppState::new(registrar));

    // Create router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        "Registrar listening on http://{} for {} accounts",
        addr,
        config.policy.institutional_domain
    );

    axum::serve(listener, app).await?;

    Ok(())
}
