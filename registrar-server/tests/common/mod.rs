//! Common test utilities for registrar integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use registrar_core::DeliverabilityStatus;
use registrar_server::{
    routes, AccountStore, AppState, DeliverabilityOracle, DeliverabilityReport, EmailSender,
    InMemoryAccountStore, OracleError, PasswordHasher, Registrar, RegistrationPolicy,
};
use serde_json::{json, Value};

/// Cheapest bcrypt cost, keeps the suite fast
pub const TEST_BCRYPT_COST: u32 = 4;

/// Mock email sender that captures verification codes
#[derive(Default, Clone)]
pub struct MockEmailSender {
    /// Captured (email, code) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
    failing: Arc<AtomicBool>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last verification code sent to an email
    pub fn get_code(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, c)| c.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    /// Make every following send fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl EmailSender for MockEmailSender {
    fn send_verification(&self, email: &str, _full_name: &str, code: &str) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("SMTP relay unavailable".into());
        }
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Oracle that answers with a scripted result and counts its calls
#[derive(Clone)]
pub struct ScriptedOracle {
    answer: Arc<RwLock<Result<DeliverabilityReport, OracleError>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            answer: Arc::new(RwLock::new(Ok(DeliverabilityReport::new(
                DeliverabilityStatus::Valid,
            )))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn answer_status(&self, status: DeliverabilityStatus) {
        *self.answer.write().unwrap() = Ok(DeliverabilityReport::new(status));
    }

    pub fn answer_error(&self, error: OracleError) {
        *self.answer.write().unwrap() = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeliverabilityOracle for ScriptedOracle {
    fn check(&self, _email: &str) -> Result<DeliverabilityReport, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.read().unwrap().clone()
    }
}

/// Handles on the collaborators behind a test registrar
#[derive(Clone)]
pub struct Collaborators {
    pub oracle: ScriptedOracle,
    pub email_sender: MockEmailSender,
}

/// Build a registrar over `store` with scripted collaborators
pub fn create_registrar<U: AccountStore>(
    store: U,
    policy: RegistrationPolicy,
) -> (Registrar<U, ScriptedOracle, MockEmailSender>, Collaborators) {
    let collaborators = Collaborators {
        oracle: ScriptedOracle::new(),
        email_sender: MockEmailSender::new(),
    };

    let registrar = Registrar::new(
        store,
        collaborators.oracle.clone(),
        collaborators.email_sender.clone(),
        PasswordHasher::new(TEST_BCRYPT_COST),
        policy,
    );

    (registrar, collaborators)
}

pub type TestState = AppState<InMemoryAccountStore, ScriptedOracle, MockEmailSender>;

/// Create a test server with the default policy
pub fn create_test_server() -> (TestServer, Arc<TestState>, Collaborators) {
    create_test_server_with_policy(RegistrationPolicy::default())
}

/// Create a test server with an explicit policy
pub fn create_test_server_with_policy(
    policy: RegistrationPolicy,
) -> (TestServer, Arc<TestState>, Collaborators) {
    let (registrar, collaborators) = create_registrar(InMemoryAccountStore::new(), policy);
    let state = Arc::new(AppState::new(registrar));

    let app = routes::create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, state, collaborators)
}

/// JSON body for POST /api/auth/register
pub fn registration_body(full_name: &str, email: &str, password: &str, carnet: &str) -> Value {
    json!({
        "fullName": full_name,
        "email": email,
        "password": password,
        "carnetNumber": carnet,
    })
}

/// Register and verify an account through the HTTP API
pub async fn create_verified_account(
    server: &TestServer,
    collaborators: &Collaborators,
    email: &str,
    carnet: &str,
) {
    let response = server
        .post("/api/auth/register")
        .json(&registration_body("Test Student", email, "s3cret-pass", carnet))
        .await;
    assert_eq!(response.status_code(), 201);

    let code = collaborators
        .email_sender
        .get_code(email)
        .expect("No verification code sent");

    let response = server
        .post("/api/auth/verify")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);
}
