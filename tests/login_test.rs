//! Integration tests for the password login step.

mod common;

use common::*;
use mockito::Server;
use onekey_client::Error;
use serde_json::json;

#[tokio::test]
async fn login_success_exposes_tenants_from_identity_token() {
    //* Given
    let mut server = Server::new_async().await;
    let authorize = mock_authorize(&mut server, EMAIL, acme_tenants()).await;

    //* When
    let mut client = make_client(&server.url());
    client.login(EMAIL, "p").await.expect("login should succeed");

    //* Then
    authorize.assert_async().await;
    assert!(client.is_authenticated());
    assert!(!client.is_tenant_selected());

    let tenants = client.get_all_tenants().unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0].name, "Acme");
    assert_eq!(
        tenants[0].id.to_string(),
        "11111111-1111-1111-1111-111111111111"
    );
    assert_eq!(client.get_tenant("Acme").unwrap().name, "Acme");
}

#[tokio::test]
async fn login_with_bad_credentials_fails() {
    //* Given
    let mut server = Server::new_async().await;
    let _authorize = server
        .mock("POST", "/authorize")
        .with_status(401)
        .with_body(r#"{"error": "invalid credentials"}"#)
        .create_async()
        .await;

    //* When
    let mut client = make_client(&server.url());
    let err = client.login(EMAIL, "wrong").await.unwrap_err();

    //* Then
    assert!(matches!(err, Error::AuthenticationFailed));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn login_rejects_token_signed_with_wrong_key() {
    //* Given a server whose identity token is signed by an untrusted key
    let mut server = Server::new_async().await;
    let _authorize = server
        .mock("POST", "/authorize")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(|request| {
            let nonce = request_nonce(request.body().expect("request body"));
            json!({"id_token": foreign_identity_token(&nonce, EMAIL, acme_tenants())})
                .to_string()
                .into_bytes()
        })
        .create_async()
        .await;

    //* When
    let mut client = make_client(&server.url());
    let err = client.login(EMAIL, "p").await.unwrap_err();

    //* Then claims are perfect but the signature is not - rejected
    assert!(matches!(err, Error::TokenInvalid(_)));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn login_rejects_replayed_nonce() {
    //* Given a server replaying a token minted for an earlier exchange
    let stale = identity_token("stale-nonce", EMAIL, acme_tenants());
    let mut server = Server::new_async().await;
    let _authorize = server
        .mock("POST", "/authorize")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id_token": stale}).to_string())
        .create_async()
        .await;

    //* When
    let mut client = make_client(&server.url());
    let err = client.login(EMAIL, "p").await.unwrap_err();

    //* Then the nonce in the claims no longer matches the fresh one
    assert!(matches!(err, Error::TokenInvalid(ref m) if m.contains("nonce")));
}

#[tokio::test]
async fn login_rejects_duplicate_tenant_names() {
    //* Given
    let tenants = json!([
        {"id": "11111111-1111-1111-1111-111111111111", "name": "Acme"},
        {"id": "22222222-2222-2222-2222-222222222222", "name": "Acme"},
    ]);
    let mut server = Server::new_async().await;
    let _authorize = mock_authorize(&mut server, EMAIL, tenants).await;

    //* When
    let mut client = make_client(&server.url());
    let err = client.login(EMAIL, "p").await.unwrap_err();

    //* Then
    assert!(matches!(err, Error::DuplicateTenantName(ref name) if name == "Acme"));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn login_reports_transport_failures_with_status() {
    //* Given
    let mut server = Server::new_async().await;
    let _authorize = server
        .mock("POST", "/authorize")
        .with_status(503)
        .with_body("upstream down")
        .create_async()
        .await;

    //* When
    let mut client = make_client(&server.url());
    let err = client.login(EMAIL, "p").await.unwrap_err();

    //* Then the status code is preserved for the caller to branch on
    match err {
        Error::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert!(body.contains("upstream down"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
