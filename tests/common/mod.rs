//! Shared helpers for the integration tests.
//!
//! Tokens are signed in-test with the RSA key pair under tests/keys/;
//! the client under test is configured to verify against the matching
//! public keys. Mocks for the two login endpoints read the nonce out
//! of the request body and bind it into the signed response, the same
//! way the real platform does.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::path::PathBuf;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mockito::{Mock, Server};
use serde_json::{json, Value};

use onekey_client::config::{CLIENT_ID, TOKEN_NAMESPACE};
use onekey_client::{Client, ClientConfig};

pub const EMAIL: &str = "a@x.com";
pub const API_TOKEN: &str = "11111111-1111-1111-1111-111111111111/secret";

pub fn key_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/keys")
        .join(name)
}

/// Install a fmt subscriber once so RUST_LOG works for failing tests.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}

pub fn make_client(server_url: &str) -> Client {
    init_tracing();
    Client::new(
        ClientConfig::new(server_url)
            .with_id_token_public_key(key_path("id_public.pem"))
            .with_tenant_token_public_key(key_path("tenant_public.pem")),
    )
    .expect("client should build")
}

fn sign_with(key_file: &str, claims: &Value) -> String {
    let pem = std::fs::read(key_path(key_file)).expect("signing key");
    encode(
        &Header::new(Algorithm::RS256),
        claims,
        &EncodingKey::from_rsa_pem(&pem).expect("valid RSA key"),
    )
    .expect("token signs")
}

pub fn identity_token(nonce: &str, email: &str, tenants: Value) -> String {
    sign_with(
        "id_private.pem",
        &json!({
            "iss": TOKEN_NAMESPACE,
            "aud": CLIENT_ID,
            "sub": email,
            "nonce": nonce,
            "exp": chrono_now() + 600,
            "https://www.onekey.com/tenants": tenants,
        }),
    )
}

pub fn tenant_token(nonce: &str, email: &str) -> String {
    sign_with(
        "tenant_private.pem",
        &json!({
            "iss": TOKEN_NAMESPACE,
            "aud": CLIENT_ID,
            "sub": email,
            "nonce": nonce,
            "exp": chrono_now() + 600,
        }),
    )
}

/// Identity token signed with a key the client does not trust.
pub fn foreign_identity_token(nonce: &str, email: &str, tenants: Value) -> String {
    sign_with(
        "other_private.pem",
        &json!({
            "iss": TOKEN_NAMESPACE,
            "aud": CLIENT_ID,
            "sub": email,
            "nonce": nonce,
            "exp": chrono_now() + 600,
            "https://www.onekey.com/tenants": tenants,
        }),
    )
}

fn chrono_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub fn request_nonce(raw_body: &[u8]) -> String {
    let body: Value = serde_json::from_slice(raw_body).expect("json request body");
    body["nonce"].as_str().expect("nonce in request").to_string()
}

pub fn acme_tenants() -> Value {
    json!([{"id": "11111111-1111-1111-1111-111111111111", "name": "Acme"}])
}

/// /authorize mock that signs an identity token over the request nonce.
pub async fn mock_authorize(server: &mut Server, email: &'static str, tenants: Value) -> Mock {
    server
        .mock("POST", "/authorize")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |request| {
            let nonce = request_nonce(request.body().expect("request body"));
            json!({"id_token": identity_token(&nonce, email, tenants.clone())})
                .to_string()
                .into_bytes()
        })
        .create_async()
        .await
}

/// /token mock that signs a tenant token over the request nonce.
pub async fn mock_token_exchange(server: &mut Server, email: &'static str) -> Mock {
    mock_token_exchange_expect(server, email, 1).await
}

/// Like [`mock_token_exchange`] with an explicit expected hit count.
pub async fn mock_token_exchange_expect(
    server: &mut Server,
    email: &'static str,
    hits: usize,
) -> Mock {
    server
        .mock("POST", "/token")
        .expect(hits)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |request| {
            let nonce = request_nonce(request.body().expect("request body"));
            json!({"tenant_token": tenant_token(&nonce, email)})
                .to_string()
                .into_bytes()
        })
        .create_async()
        .await
}

/// /graphql mock answering the self-describing query used by token login.
pub async fn mock_get_self(server: &mut Server, email: &str, tenant_name: &str) -> Mock {
    server
        .mock("POST", "/graphql")
        .match_header("authorization", format!("Bearer {API_TOKEN}").as_str())
        .match_body(mockito::Matcher::Regex("user".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": {"user": {"email": email}, "tenant": {"name": tenant_name}}})
                .to_string(),
        )
        .create_async()
        .await
}

/// Drive a client into the TenantSelected state via the token login
/// path. The returned mock must stay alive as long as the test needs
/// the self query to answer.
pub async fn token_login(server: &mut Server) -> (Client, Mock) {
    let self_mock = mock_get_self(server, EMAIL, "Acme").await;
    let mut client = make_client(&server.url());
    client
        .login_with_token(API_TOKEN)
        .await
        .expect("token login should succeed");
    (client, self_mock)
}
