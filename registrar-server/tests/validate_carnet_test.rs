//! Tests for POST /api/auth/validate-carnet

mod common;

use common::{create_test_server, create_test_server_with_policy, registration_body};
use registrar_server::RegistrationPolicy;
use serde_json::{json, Value};

/// Test: a well-formed unused carnet is available
#[tokio::test]
async fn test_validate_carnet_available() {
    let (server, _, _) = create_test_server();

    for carnet in ["0904-22-1234", "0904-22-12345"] {
        let response = server
            .post("/api/auth/validate-carnet")
            .json(&json!({ "carnetNumber": carnet }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["valid"], true, "{}", carnet);
        assert_eq!(body["available"], true, "{}", carnet);
    }
}

/// Test: malformed carnets are reported invalid, not as errors
#[tokio::test]
async fn test_validate_carnet_bad_format() {
    let (server, _, _) = create_test_server_with_policy(RegistrationPolicy {
        require_carnet_format: true,
        ..RegistrationPolicy::default()
    });

    for carnet in ["2021001", "0904-2-1234", "0904-22-123", "ABCD-22-1234"] {
        let response = server
            .post("/api/auth/validate-carnet")
            .json(&json!({ "carnetNumber": carnet }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["valid"], false, "{}", carnet);
        assert_eq!(body["available"], false, "{}", carnet);
    }
}

/// Test: without layout enforcement any non-empty carnet is valid
#[tokio::test]
async fn test_validate_carnet_free_form_by_default() {
    let (server, _, _) = create_test_server();

    let response = server
        .post("/api/auth/validate-carnet")
        .json(&json!({ "carnetNumber": "2021001" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["valid"], true);
    assert_eq!(body["available"], true);
}

/// Test: a carnet held by a pending account is unavailable
#[tokio::test]
async fn test_validate_carnet_taken() {
    let (server, _, _) = create_test_server();

    server
        .post("/api/auth/register")
        .json(&registration_body(
            "Ana Ruiz",
            "ana.ruiz@miumg.edu.gt",
            "Secr3t!",
            "0904-22-1234",
        ))
        .await;

    let response = server
        .post("/api/auth/validate-carnet")
        .json(&json!({ "carnetNumber": "0904-22-1234" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["valid"], true);
    assert_eq!(body["available"], false);
    assert_eq!(body["message"], "This carnet is already registered");
}

/// Test: an empty carnet is a validation error
#[tokio::test]
async fn test_validate_carnet_required() {
    let (server, _, _) = create_test_server();

    let response = server
        .post("/api/auth/validate-carnet")
        .json(&json!({ "carnetNumber": "   " }))
        .await;

    assert_eq!(response.status_code(), 400);
}
